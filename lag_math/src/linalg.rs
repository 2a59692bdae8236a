//! Small dense linear algebra on `ndarray` matrices
//!
//! A lagged monthly model carries a handful of regressors, so the normal
//! equations are solved directly with partial pivoting.

use ndarray::{s, Array1, Array2};

use crate::{MathError, Result};

const PIVOT_TOLERANCE: f64 = 1e-12;

fn check_square(a: &Array2<f64>) -> Result<usize> {
    let (rows, cols) = a.dim();
    if rows == 0 {
        return Err(MathError::InvalidInput("Matrix is empty".to_string()));
    }
    if rows != cols {
        return Err(MathError::InvalidInput(format!(
            "Matrix must be square ({}x{})",
            rows, cols
        )));
    }
    Ok(rows)
}

fn pivot_row(m: &Array2<f64>, col: usize) -> usize {
    (col..m.nrows())
        .max_by(|&i, &j| m[[i, col]].abs().total_cmp(&m[[j, col]].abs()))
        .unwrap_or(col)
}

fn swap_rows(m: &mut Array2<f64>, a: usize, b: usize) {
    if a == b {
        return;
    }
    for k in 0..m.ncols() {
        m.swap([a, k], [b, k]);
    }
}

/// Solve `a * x = b` by Gaussian elimination with partial pivoting
pub fn solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = check_square(a)?;
    if b.len() != n {
        return Err(MathError::InvalidInput(format!(
            "Right-hand side length ({}) doesn't match matrix size ({})",
            b.len(),
            n
        )));
    }

    let scale = a.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())).max(1.0);
    let mut m = a.clone();
    let mut rhs = b.clone();

    for col in 0..n {
        let pivot = pivot_row(&m, col);
        if m[[pivot, col]].abs() <= PIVOT_TOLERANCE * scale {
            return Err(MathError::SingularMatrix(format!(
                "No usable pivot in column {}",
                col
            )));
        }
        swap_rows(&mut m, col, pivot);
        rhs.swap(col, pivot);

        let pivot_values = m.row(col).to_owned();
        for row in (col + 1)..n {
            let factor = m[[row, col]] / pivot_values[col];
            if factor == 0.0 {
                continue;
            }
            m.row_mut(row).scaled_add(-factor, &pivot_values);
            let carried = rhs[col];
            rhs[row] -= factor * carried;
        }
    }

    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail = m.slice(s![row, row + 1..]).dot(&x.slice(s![row + 1..]));
        x[row] = (rhs[row] - tail) / m[[row, row]];
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(MathError::CalculationError(
            "Solution contains non-finite values".to_string(),
        ));
    }
    Ok(x)
}

/// Determinant via LU elimination
pub fn determinant(a: &Array2<f64>) -> Result<f64> {
    let n = check_square(a)?;
    let mut m = a.clone();
    let mut det = 1.0;

    for col in 0..n {
        let pivot = pivot_row(&m, col);
        if m[[pivot, col]] == 0.0 {
            return Ok(0.0);
        }
        if pivot != col {
            swap_rows(&mut m, col, pivot);
            det = -det;
        }
        det *= m[[col, col]];

        let pivot_values = m.row(col).to_owned();
        for row in (col + 1)..n {
            let factor = m[[row, col]] / pivot_values[col];
            m.row_mut(row).scaled_add(-factor, &pivot_values);
        }
    }

    Ok(det)
}

/// Ordinary least squares through the normal equations `(XᵀX) β = Xᵀy`.
///
/// `x` holds one row per observation; no intercept column is added, callers
/// that want one include a constant column.
pub fn least_squares(x: &Array2<f64>, y: &Array1<f64>) -> Result<Array1<f64>> {
    let (n, p) = x.dim();
    if n == 0 {
        return Err(MathError::InsufficientData(
            "Least squares needs at least one observation".to_string(),
        ));
    }
    if n != y.len() {
        return Err(MathError::InvalidInput(format!(
            "Design rows ({}) don't match targets ({})",
            n,
            y.len()
        )));
    }
    if p == 0 {
        return Err(MathError::InvalidInput(
            "Design matrix has no columns".to_string(),
        ));
    }
    if n < p {
        return Err(MathError::InsufficientData(format!(
            "Need at least {} observations for {} coefficients, have {}",
            p, p, n
        )));
    }

    let xtx = x.t().dot(x);
    let xty = x.t().dot(y);
    solve(&xtx, &xty)
}
