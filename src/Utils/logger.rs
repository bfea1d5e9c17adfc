use csv::Writer;
use nalgebra::{DMatrix, DVector};
use std::error::Error;

/// Write an integration trajectory as CSV: one row per accepted step, the
/// independent variable first, then one column per state component.
///
/// `names` labels the state columns; components beyond `names.len()` fall
/// back to `y1, y2, ...`. The time mesh and the state matrix must agree on
/// the number of accepted steps; the check runs before the file is created.
pub fn save_trajectory_csv(
    path: &str,
    arg: &str,
    names: &[String],
    t: &DVector<f64>,
    y: &DMatrix<f64>,
) -> Result<(), Box<dyn Error>> {
    if t.len() != y.nrows() {
        return Err(format!(
            "trajectory has {} time points but {} state rows",
            t.len(),
            y.nrows()
        )
        .into());
    }

    let mut writer = Writer::from_path(path)?;
    let mut header: Vec<String> = Vec::with_capacity(y.ncols() + 1);
    header.push(arg.to_string());
    for j in 0..y.ncols() {
        match names.get(j) {
            Some(name) => header.push(name.clone()),
            None => header.push(format!("y{}", j + 1)),
        }
    }
    writer.write_record(&header)?;

    let mut record: Vec<String> = Vec::with_capacity(y.ncols() + 1);
    for (i, ti) in t.iter().enumerate() {
        record.clear();
        record.push(ti.to_string());
        for j in 0..y.ncols() {
            record.push(y[(i, j)].to_string());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatched_trajectory_fails_before_writing() {
        let t = DVector::from_vec(vec![0.0, 0.1, 0.2]);
        let y = DMatrix::zeros(2, 1);
        let path = std::env::temp_dir().join("rustedode_mismatch.csv");
        let res = save_trajectory_csv(path.to_str().unwrap(), "t", &[], &t, &y);
        assert!(res.is_err());
    }
}
