//! Export temperature trajectories to CSV.
//!
//! One row per time step. Columns are `time_ns`, then one `T_<shot>` column per
//! shot, followed by `mass_<shot>` and `annealed_<shot>` when those states were
//! integrated.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::TemperatureTrajectory;
use crate::error::AppError;

/// Render a trajectory as CSV text.
pub fn trajectory_csv(traj: &TemperatureTrajectory) -> String {
    let shots = traj.n_shots();
    let mut header = vec!["time_ns".to_string()];
    header.extend((0..shots).map(|s| format!("T_{s}")));
    if traj.mass.is_some() {
        header.extend((0..shots).map(|s| format!("mass_{s}")));
    }
    if traj.annealed.is_some() {
        header.extend((0..shots).map(|s| format!("annealed_{s}")));
    }

    let mut out = header.join(",");
    out.push('\n');
    for (i, t) in traj.time.iter().enumerate() {
        let mut row = vec![format!("{t:.6}")];
        row.extend(traj.temperature.row(i).iter().map(|v| format!("{v:.6}")));
        if let Some(mass) = &traj.mass {
            row.extend(mass.row(i).iter().map(|v| format!("{v:.10}")));
        }
        if let Some(annealed) = &traj.annealed {
            row.extend(annealed.row(i).iter().map(|v| format!("{v:.10}")));
        }
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Write a trajectory CSV file.
pub fn write_trajectory_csv(path: &Path, traj: &TemperatureTrajectory) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create trajectory CSV '{}': {e}", path.display())))?;
    file.write_all(trajectory_csv(traj).as_bytes())
        .map_err(|e| AppError::io(format!("Failed to write trajectory CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lists_optional_states() {
        let traj = TemperatureTrajectory::single(
            vec![0.0, 10.0],
            vec![3000.0, 2900.0],
            Some(vec![1.0, 0.99]),
            None,
        );
        let csv = trajectory_csv(&traj);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "time_ns,T_0,mass_0");
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("10.000000,2900.000000,0.99"));
    }

    #[test]
    fn one_column_per_shot() {
        let a = TemperatureTrajectory::single(vec![0.0, 1.0], vec![3000.0, 2900.0], None, None);
        let b = TemperatureTrajectory::single(vec![0.0, 1.0], vec![3100.0, 3000.0], None, None);
        let batch = TemperatureTrajectory::stack(&[a, b]).unwrap();
        let csv = trajectory_csv(&batch);
        assert_eq!(csv.lines().next(), Some("time_ns,T_0,T_1"));
        assert_eq!(csv.lines().nth(1), Some("0.000000,3000.000000,3100.000000"));
    }

    #[test]
    fn writes_file() {
        let path = std::env::temp_dir().join(format!("lii-trajectory-{}.csv", std::process::id()));
        let traj = TemperatureTrajectory::single(vec![0.0, 1.0], vec![1.0, 2.0], None, None);
        write_trajectory_csv(&path, &traj).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(text, trajectory_csv(&traj));
    }
}
