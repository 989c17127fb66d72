//! Small dense linear algebra for coefficient estimation

use crate::{MathError, Result};

/// Pivots smaller than this are treated as zero
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Build the symmetric Toeplitz matrix `M[i][j] = first_column[|i - j|]`
pub fn toeplitz(first_column: &[f64], size: usize) -> Result<Vec<Vec<f64>>> {
    if first_column.len() < size {
        return Err(MathError::InsufficientData(format!(
            "Toeplitz matrix of size {} needs {} entries, have {}",
            size,
            size,
            first_column.len()
        )));
    }

    Ok((0..size)
        .map(|i| (0..size).map(|j| first_column[i.abs_diff(j)]).collect())
        .collect())
}

/// Add `ridge` to every diagonal entry
pub fn add_ridge(matrix: &mut [Vec<f64>], ridge: f64) {
    for (i, row) in matrix.iter_mut().enumerate() {
        row[i] += ridge;
    }
}

/// Solve `A x = b` by Gaussian elimination with partial pivoting
pub fn solve(matrix: &[Vec<f64>], rhs: &[f64]) -> Result<Vec<f64>> {
    let n = rhs.len();
    if matrix.len() != n || matrix.iter().any(|row| row.len() != n) {
        return Err(MathError::InvalidInput(format!(
            "Expected a {}x{} matrix for a right-hand side of length {}",
            n, n, n
        )));
    }

    // Augmented copy
    let mut a: Vec<Vec<f64>> = matrix
        .iter()
        .zip(rhs)
        .map(|(row, &b)| {
            let mut augmented = row.clone();
            augmented.push(b);
            augmented
        })
        .collect();

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&x, &y| a[x][col].abs().total_cmp(&a[y][col].abs()))
            .unwrap_or(col);

        let pivot = a[pivot_row][col];
        if !pivot.is_finite() || pivot.abs() < PIVOT_TOLERANCE {
            return Err(MathError::SingularMatrix(col));
        }
        a.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..=n {
                a[row][k] -= factor * a[col][k];
            }
        }
    }

    // Back substitution
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (a[row][n] - tail) / a[row][row];
    }

    Ok(x)
}
