use expmat_core::{CancellationToken, Matrix, MatrixConfig, MatrixError};
use num_rational::Ratio;

type Q = Ratio<i64>;

fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

fn q(n: i64) -> Q {
    Ratio::from_integer(n)
}

fn rational(rows: &[&[i64]]) -> Matrix<Q> {
    let rows: Vec<Vec<Q>> = rows
        .iter()
        .map(|row| row.iter().map(|&v| q(v)).collect())
        .collect();
    Matrix::from_rows(&rows).unwrap()
}

fn sample_5x5() -> Matrix<Q> {
    rational(&[
        &[10, 1, 2, 0, 1],
        &[3, 12, 1, 2, 0],
        &[2, 5, 15, 1, 1],
        &[1, 0, 2, 9, 3],
        &[0, 1, 1, 2, 8],
    ])
}

#[test]
fn test_exact_inverse_small() -> Result<(), MatrixError> {
    let a = rational(&[&[1, 2, 3], &[0, 1, 4], &[5, 6, 0]]);
    assert_eq!(a.determinant()?, q(1));
    let expected = rational(&[&[-24, 18, 5], &[20, -15, -4], &[-5, 4, 1]]);
    assert_eq!(a.inverse()?, expected);
    Ok(())
}

#[test]
fn test_exact_inverse_via_adjugate() -> Result<(), MatrixError> {
    init_logging();
    let a = sample_5x5();
    assert_eq!(a.determinant()?, q(112_449));
    let inv = a.inverse()?;
    assert_eq!(a.dot_product(&inv)?, Matrix::identity(5));
    assert_eq!(inv.dot_product(&a)?, Matrix::identity(5));
    Ok(())
}

#[test]
fn test_fraction_entries() -> Result<(), MatrixError> {
    let mut a: Matrix<Q> = Matrix::new();
    a.set(0, 0, Ratio::new(1, 2));
    a.set(1, 1, Ratio::new(2, 3));
    let inv = a.inverse()?;
    assert_eq!(inv.get(0, 0), q(2));
    assert_eq!(inv.get(1, 1), Ratio::new(3, 2));
    assert_eq!(a.trace()?, Ratio::new(7, 6));
    Ok(())
}

#[test]
fn test_determinant_is_multiplicative() -> Result<(), MatrixError> {
    let a = rational(&[&[2, -3, 1], &[2, 0, -1], &[1, 4, 5]]);
    let b = rational(&[&[1, 0, 2], &[0, 3, 1], &[4, 1, 1]]);
    let product = a.dot_product(&b)?;
    assert_eq!(product.determinant()?, a.determinant()? * b.determinant()?);
    Ok(())
}

#[test]
fn test_add_then_subtract_restores_operand() -> Result<(), MatrixError> {
    let a = sample_5x5();
    let b = a.transpose()?.multiply_scalar(&q(-3))?;
    assert_eq!(a.add(&b)?.subtract(&b)?, a);
    assert_eq!(a.subtract(&a)?.nnz(), 0);
    assert_eq!(a.subtract(&a)?.dims(), (5, 5));
    Ok(())
}

#[test]
fn test_transpose_of_product() -> Result<(), MatrixError> {
    let a = rational(&[&[1, 2, 0], &[0, 1, 5]]);
    let b = rational(&[&[3, 1], &[0, 2], &[7, 0]]);
    let left = a.dot_product(&b)?.transpose()?;
    let right = b.transpose()?.dot_product(&a.transpose()?)?;
    assert_eq!(left, right);
    assert_eq!(a.transpose()?.transpose()?, a);
    Ok(())
}

#[test]
fn test_results_independent_of_parallelism() -> Result<(), MatrixError> {
    init_logging();
    let mut serial = sample_5x5();
    serial.set_max_degree_of_parallelism(1)?;
    let mut wide = sample_5x5();
    wide.set_max_degree_of_parallelism(8)?;

    assert_eq!(serial.inverse()?, wide.inverse()?);
    assert_eq!(serial.power(3)?, wide.power(3)?);
    assert_eq!(serial.determinant()?, wide.determinant()?);
    Ok(())
}

#[test]
fn test_results_inherit_configuration() -> Result<(), MatrixError> {
    init_logging();
    let config = MatrixConfig::new(3)?;
    let mut a: Matrix<i64> = Matrix::with_config(config);
    a.set(0, 0, 1);
    a.set(1, 1, 1);
    assert_eq!(a.transpose()?.config(), &config);
    assert_eq!(a.dot_product(&a)?.max_degree_of_parallelism(), 3);
    Ok(())
}

#[test]
fn test_cancelled_operations_fail() {
    init_logging();
    let token = CancellationToken::new();
    let a = sample_5x5().with_cancellation(token.clone());
    assert!(a.inverse().is_ok());

    token.cancel();
    assert!(matches!(a.add(&a), Err(MatrixError::Cancelled)));
    assert!(matches!(a.inverse(), Err(MatrixError::Cancelled)));
    assert!(matches!(a.transpose(), Err(MatrixError::Cancelled)));
}

#[test]
fn test_concurrent_writers_through_shared_store() {
    init_logging();
    let matrix: Matrix<i64> = Matrix::new();
    std::thread::scope(|scope| {
        for t in 0..4 {
            let store = matrix.store();
            scope.spawn(move || {
                for i in 0..50 {
                    store.set(t * 50 + i, i % 7, (t * 1000 + i) as i64 + 1);
                }
            });
        }
    });
    assert_eq!(matrix.dims(), (200, 7));
    assert_eq!(matrix.nnz(), 200);
    assert_eq!(matrix.get(199, 49 % 7), 3050);
}

#[test]
fn test_diag_and_trace_agree() -> Result<(), MatrixError> {
    let a = sample_5x5();
    let diagonal = Matrix::diag(&a.diag_vector()?)?;
    assert!(diagonal.is_diagonal());
    assert_eq!(diagonal.trace()?, a.trace()?);
    assert_eq!(a.trace()?, q(54));
    Ok(())
}

#[test]
fn test_exact_rotation_is_orthogonal() -> Result<(), MatrixError> {
    // 3-4-5 rotation: exact fractions give an exact identity product.
    let fifth = |n: i64| Ratio::new(n, 5);
    let rotation = Matrix::from_rows(&[vec![fifth(3), fifth(-4)], vec![fifth(4), fifth(3)]])?;
    assert!(rotation.is_orthogonal()?);
    assert!(rotation.is_unitary()?);

    let stretched = rotation.multiply_scalar(&q(2))?;
    assert!(!stretched.is_orthogonal()?);
    Ok(())
}
