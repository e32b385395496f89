//! Dense vector helpers used by the update and scoring paths.

/// Dot product
pub fn dot_product(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum()
}

/// In-place scaling: a *= scale
pub fn scale_in_place(a: &mut [f64], scale: f64) {
    for ai in a.iter_mut() {
        *ai *= scale;
    }
}

/// L1 norm
pub fn l1_norm(a: &[f64]) -> f64 {
    a.iter().map(|x| x.abs()).sum()
}

/// L2 norm
pub fn l2_norm(a: &[f64]) -> f64 {
    dot_product(a, a).sqrt()
}

/// One joint SGD step with L2 regularization on a (user, item) factor pair.
///
/// Both outputs are computed from the inputs as given, so the step is a
/// proper joint gradient step:
///
/// ```text
/// u'[j] = u[j] + lr * (err * v[j] - reg * u[j])
/// v'[j] = v[j] + lr * (err * u[j] - reg * v[j])
/// ```
pub fn gradient_step(u: &[f64], v: &[f64], err: f64, lr: f64, reg: f64) -> (Vec<f64>, Vec<f64>) {
    let u_new = u
        .iter()
        .zip(v.iter())
        .map(|(&uj, &vj)| uj + lr * (err * vj - reg * uj))
        .collect();
    let v_new = v
        .iter()
        .zip(u.iter())
        .map(|(&vj, &uj)| vj + lr * (err * uj - reg * vj))
        .collect();
    (u_new, v_new)
}
