//! Vector helpers used by the layers

/// Elementwise `v3 = v1 + v2`
pub fn sum(v1: &[f32], v2: &[f32], v3: &mut [f32]) {
    assert_eq!(v1.len(), v2.len());
    assert_eq!(v1.len(), v3.len());
    for i in 0..v1.len() {
        v3[i] = v1[i] + v2[i];
    }
}

/// Elementwise `v1 += v2`
pub fn inplace_sum(v1: &mut [f32], v2: &[f32]) {
    assert_eq!(v1.len(), v2.len());
    for (a, b) in v1.iter_mut().zip(v2) {
        *a += b;
    }
}

/// Dot product
pub fn dot(v1: &[f32], v2: &[f32]) -> f32 {
    assert_eq!(v1.len(), v2.len());
    v1.iter().zip(v2).map(|(a, b)| a * b).sum()
}

/// Scales a vector in place
pub fn scale(v1: &mut [f32], s: f32) {
    for x in v1.iter_mut() {
        *x *= s;
    }
}

/// Numerically stable softmax, in place
pub fn softmax(v: &mut [f32]) {
    let max = v.iter().cloned().fold(std::f32::NEG_INFINITY, f32::max);
    let mut total = 0.0;
    for x in v.iter_mut() {
        *x = (*x - max).exp();
        total += *x;
    }
    scale(v, 1.0 / total);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_and_sums() {
        assert_eq!(dot(&[1.0, 2.0, 3.0], &[4.0, -5.0, 6.0]), 12.0);
        let mut out = [0f32; 2];
        sum(&[1.0, 2.0], &[0.5, 0.25], &mut out);
        assert_eq!(out, [1.5, 2.25]);
        inplace_sum(&mut out, &[1.0, 1.0]);
        assert_eq!(out, [2.5, 3.25]);
    }

    #[test]
    fn test_softmax() {
        let mut v = [1.0, 2.0, 3.0];
        softmax(&mut v);
        let expected = [0.09003057, 0.24472847, 0.66524096];
        for (e, a) in expected.iter().zip(v.iter()) {
            assert!((e - a).abs() < 1e-6);
        }

        // Large logits don't overflow
        let mut v = [1000.0, 1000.0];
        softmax(&mut v);
        assert_eq!(v, [0.5, 0.5]);
    }
}
