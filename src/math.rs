use itertools::izip;
use multiversion::multiversion;

#[multiversion(targets("x86_64+avx+avx2+fma", "x86_64+sse4.1", "aarch64+neon"))]
pub(crate) fn vector_dot(a: &[f64], b: &[f64]) -> f64 {
    assert!(a.len() == b.len());

    izip!(a, b).fold(0f64, |acc, (x, y)| acc + x * y)
}

/// Compute `((plus - minus) . x, (plus - minus) . y)` in one pass.
///
/// Used for the U-turn criterion, where `x` and `y` are the momenta
/// at the two ends of a trajectory.
#[multiversion(targets("x86_64+avx+avx2+fma", "x86_64+sse4.1", "aarch64+neon"))]
pub(crate) fn scalar_prods_diff(plus: &[f64], minus: &[f64], x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = plus.len();

    assert!(minus.len() == n);
    assert!(x.len() == n);
    assert!(y.len() == n);

    izip!(plus, minus, x, y).fold((0f64, 0f64), |(s1, s2), (a, b, x, y)| {
        let diff = a - b;
        (s1 + diff * x, s2 + diff * y)
    })
}

#[multiversion(targets("x86_64+avx+avx2+fma", "x86_64+sse4.1", "aarch64+neon"))]
pub(crate) fn axpy(x: &[f64], y: &mut [f64], a: f64) {
    assert!(x.len() == y.len());

    izip!(x, y).for_each(|(x, y)| {
        *y += a * x;
    });
}

#[multiversion(targets("x86_64+avx+avx2+fma", "x86_64+sse4.1", "aarch64+neon"))]
pub(crate) fn axpy_out(x: &[f64], y: &[f64], a: f64, out: &mut [f64]) {
    let n = x.len();
    assert!(y.len() == n);
    assert!(out.len() == n);

    izip!(x, y, out).for_each(|(x, y, out)| {
        *out = a * x + y;
    });
}

pub(crate) fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|x| x.is_finite())
}
