use approx::assert_relative_eq;
use descent::backprop::*;
use descent::tensor;
use descent::tensors::{Tensor, WithGrad};

#[test]
fn test_tensor_shape_mismatch_panics() {
    let result = std::panic::catch_unwind(|| {
        Tensor::new(vec![2, 2], vec![1.0, 2.0, 3.0]);
    });
    assert!(result.is_err());
}

#[test]
fn test_tensor_macro_shapes() {
    let v = tensor!([1.0, 2.0, 3.0]);
    assert_eq!(v.shape, vec![3]);
    let m = tensor!([[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
    assert_eq!(m.shape, vec![3, 2]);
    assert_eq!(m.data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
}

#[test]
fn test_relu_backprop() {
    let (out, back) = relu(&tensor!([-1.0, 0.0, 2.0]));
    assert_eq!(out.data, vec![0.0, 0.0, 2.0]);

    let grad_in = back(&tensor!([1.0, 1.0, 1.0]));
    assert_eq!(grad_in.data, vec![0.0, 0.0, 1.0]);
}

#[test]
fn test_sigmoid_backprop() {
    let (out, back) = sigmoid(&tensor!([0.0]));
    assert_relative_eq!(out.data[0], 0.5);

    let grad_in = back(&tensor!([1.0]));
    assert_relative_eq!(grad_in.data[0], 0.25);
}

#[test]
fn test_matmul_forward_and_backprop() {
    let a = tensor!([[1.0, 2.0], [3.0, 4.0]]);
    let b = tensor!([[5.0, 6.0], [7.0, 8.0]]);
    let (out, back) = matmul(&a, &b);
    assert_eq!(out.shape, vec![2, 2]);
    assert_eq!(out.data, vec![19.0, 22.0, 43.0, 50.0]);

    let (da, db) = back(&tensor!([[1.0, 1.0], [1.0, 1.0]]));
    assert_eq!(da.data, vec![11.0, 15.0, 11.0, 15.0]);
    assert_eq!(db.data, vec![4.0, 4.0, 6.0, 6.0]);
}

#[test]
fn test_add_bias_backprop() {
    let x = tensor!([[1.0, 2.0], [3.0, 4.0]]);
    let b = tensor!([10.0, 20.0]);
    let (out, back) = add_bias(&x, &b);
    assert_eq!(out.data, vec![11.0, 22.0, 13.0, 24.0]);

    let (dx, db) = back(&tensor!([[1.0, 2.0], [3.0, 4.0]]));
    assert_eq!(dx.data, vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(db.data, vec![4.0, 6.0]);
}

#[test]
fn test_mse_loss_value_and_gradient() {
    // sum((y - t)^2) / (2n) with n = 2 elements
    let pred = tensor!([1.0, 2.0]);
    let target = tensor!([0.0, 0.0]);
    let (loss, back) = mse_loss(&pred, &target);
    assert_relative_eq!(loss, 1.25);

    let grad = back(1.0);
    assert_eq!(grad.shape, vec![2]);
    assert_relative_eq!(grad.data[0], 0.5);
    assert_relative_eq!(grad.data[1], 1.0);
}

#[test]
fn test_mse_loss_non_negative() {
    let pred = tensor!([[0.3, -0.7], [1.5, 0.0]]);
    let target = tensor!([[0.0, 1.0], [1.0, 0.0]]);
    let (loss, _back) = mse_loss(&pred, &target);
    assert!(loss >= 0.0);
}

#[test]
fn test_nll_loss_value_and_gradient() {
    let half = 0.5_f64.ln();
    let logp = Tensor::new(vec![1, 2], vec![half, half]);
    let (loss, back) = nll_loss(&logp, &[0]);
    assert_relative_eq!(loss, 2.0_f64.ln());

    let grad = back(1.0);
    assert_eq!(grad.data, vec![-1.0, 0.0]);
}

#[test]
fn test_nll_loss_non_negative_on_log_probs() {
    let (logp, _) = log_softmax(&tensor!([[0.3, -1.2, 4.0], [0.0, 0.0, 0.0]]));
    let (loss, _back) = nll_loss(&logp, &[2, 1]);
    assert!(loss >= 0.0);
}

#[test]
fn test_log_softmax_rows_exponentiate_to_one() {
    let (logp, _back) = log_softmax(&tensor!([[0.5, -2.0, 3.0], [1.0, 1.0, 1.0]]));
    for row in logp.data.chunks(3) {
        let total: f64 = row.iter().map(|lp| lp.exp()).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }
}

#[test]
fn test_log_softmax_large_scores_do_not_overflow() {
    let (logp, _back) = log_softmax(&tensor!([[1000.0, 1000.0, 1000.0]]));
    let expected = -(3.0_f64.ln());
    for &lp in &logp.data {
        assert!(lp.is_finite());
        assert_relative_eq!(lp, expected, epsilon = 1e-12);
    }
}

#[test]
fn test_log_softmax_backprop() {
    // symmetric two-class row: softmax is 0.5 each
    let (_logp, back) = log_softmax(&tensor!([[0.0, 0.0]]));
    let grad = back(&tensor!([[1.0, 0.0]]));
    assert_relative_eq!(grad.data[0], 0.5, epsilon = 1e-12);
    assert_relative_eq!(grad.data[1], -0.5, epsilon = 1e-12);
}

#[test]
fn test_gradient_accumulates_until_cleared() {
    let mut w = WithGrad::new(tensor!([1.0, 1.0]));
    assert!(w.grad().is_none());

    w.accumulate(&tensor!([1.0, 2.0]));
    w.accumulate(&tensor!([0.5, 0.5]));
    assert_eq!(w.grad().unwrap().data, vec![1.5, 2.5]);

    w.clear_grad();
    assert!(w.grad().is_none());
}

#[test]
fn test_sgd_update_law() {
    // p' = 2.0 - 0.01 * 4.0 = 1.96
    let mut w = WithGrad::new(tensor!([2.0]));
    w.accumulate(&tensor!([4.0]));
    sgd(&mut w, 0.01).unwrap();
    assert_relative_eq!(w.value.data[0], 1.96);
    assert!(w.grad().is_none());
}

#[test]
fn test_sgd_without_gradient_is_an_error() {
    let mut w = WithGrad::new(tensor!([2.0]));
    assert!(matches!(
        sgd(&mut w, 0.01),
        Err(descent::Error::NoGradient { .. })
    ));
}
