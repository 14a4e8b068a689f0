//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the models stay free of presentation concerns
//! - output changes are localized

use ndarray::Axis;

use crate::domain::{BlackbodyLaw, PyrometryKind, PyrometryResult, TemperatureTrajectory};
use crate::ht::HtOptions;
use crate::models::SpectroscopicModel;
use crate::props::MaterialProperties;
use crate::report::Comparison;

/// Format a heat-transfer run: setup, active submodels, and a sampled history.
pub fn format_simulation_summary(
    props: &MaterialProperties,
    opts: &HtOptions,
    traj: &TemperatureTrajectory,
    diameters: &[f64],
    max_rows: usize,
) -> String {
    let mut out = String::new();

    out.push_str("=== lii - TiRe-LII simulation ===\n");
    out.push_str(&format!(
        "Material: {} in {}\n",
        props.material.display_name(),
        props.gas.display_name()
    ));
    out.push_str(&format!(
        "Gas: Tg={:.1} K | pg={:.0} Pa\n",
        props.gas_props.tg, props.gas_props.pg
    ));
    out.push_str(&format!(
        "Laser: F0={:.3} J/cm² | FWHM={:.2} ns | λ={:.0} nm\n",
        props.laser.f0, props.laser.tlp, props.laser.llaser
    ));
    out.push_str(&format!("Submodels: {}\n", submodel_list(opts)));
    out.push_str(&format!("Diameters: {} nm\n", fmt_vec(diameters, 1)));
    if let (Some(first), Some(last)) = (traj.time.first(), traj.time.last()) {
        out.push_str(&format!("Grid: n={} | t=[{first:.2}, {last:.2}] ns\n", traj.len()));
    }

    let mean_t = traj.mean_temperature();
    let mean_mass = traj
        .mass
        .as_ref()
        .and_then(|m| m.mean_axis(Axis(1)))
        .map(|m| m.to_vec());

    out.push('\n');
    if let Some((time, temp)) = traj.peak() {
        out.push_str(&format!("Peak temperature: {temp:.1} K at t={time:.2} ns\n"));
    }
    if let Some(t_end) = mean_t.last() {
        out.push_str(&format!("Final temperature: {t_end:.1} K\n"));
    }
    if let Some(m_end) = mean_mass.as_ref().and_then(|m| m.last()) {
        out.push_str(&format!("Final mass fraction: {m_end:.4}\n"));
    }

    out.push('\n');
    out.push_str(&format!("{:>12} {:>10} {:>10}\n", "time_ns", "T_K", "m/m0"));
    out.push_str(&format!("{:->12} {:->10} {:->10}\n", "", "", ""));
    for i in sample_rows(traj.len(), max_rows) {
        let mass = mean_mass
            .as_ref()
            .map(|m| format!("{:.4}", m[i]))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!("{:>12.2} {:>10.1} {:>10}\n", traj.time[i], mean_t[i], mass));
    }

    out
}

/// Format the inversion setup and diagnostics.
pub fn format_inversion_summary(model: &SpectroscopicModel, result: &PyrometryResult) -> String {
    let opts = model.options();
    let mut out = String::new();

    out.push_str("=== lii - pyrometry inversion ===\n");
    let strategy = match result.strategy {
        PyrometryKind::SpectralFit => format!(
            "{} ({})",
            result.strategy.display_name(),
            opts.multicolor.display_name()
        ),
        kind => kind.display_name().to_string(),
    };
    out.push_str(&format!("Strategy: {strategy}\n"));
    out.push_str(&format!("Wavelengths: {} nm\n", fmt_vec(model.wavelengths(), 1)));
    out.push_str(&format!(
        "Blackbody: {}\n",
        match opts.law {
            BlackbodyLaw::Planck => "Planck",
            BlackbodyLaw::Wien => "Wien",
        }
    ));
    if let [l1, l2] = model.wavelengths() {
        out.push_str(&format!("E(m) ratio: {:.4}\n", model.emr(*l1, *l2)));
    }

    out.push('\n');
    out.push_str(&format!(
        "Initial temperature: {:.1} K\n",
        result.diagnostics.initial_temperature
    ));
    if let Some(c) = result.mean_scaling() {
        let finite: Vec<f64> = c.into_iter().filter(|v| v.is_finite()).collect();
        if !finite.is_empty() {
            let avg = finite.iter().sum::<f64>() / finite.len() as f64;
            out.push_str(&format!("Mean scaling factor: {avg:.4e}\n"));
        }
    }
    if result.diagnostics.degenerate > 0 {
        out.push_str(&format!(
            "Degenerate samples (real part kept): {}\n",
            result.diagnostics.degenerate
        ));
    }
    if let Some(draws) = &result.diagnostics.mc_draws {
        out.push_str(&format!("Monte-Carlo draws per time step: {}\n", draws.ncols()));
    }
    if let (Some(iterations), Some(converged)) = (result.diagnostics.iterations, result.diagnostics.converged) {
        out.push_str(&format!("Fit: iterations={iterations} converged={converged}\n"));
    }

    out
}

/// Format an estimate-versus-truth table with aggregate errors.
pub fn format_comparison(cmp: &Comparison, result: &PyrometryResult, max_rows: usize) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Accuracy: RMSE={:.2} K | bias={:+.2} K | max|err|={:.2} K\n\n",
        cmp.rmse, cmp.bias, cmp.max_abs
    ));
    out.push_str(&format!(
        "{:>12} {:>10} {:>10} {:>10} {:>9}\n",
        "time_ns", "T_true", "T_est", "σ_T", "error"
    ));
    out.push_str(&format!("{:->12} {:->10} {:->10} {:->10} {:->9}\n", "", "", "", "", ""));
    for i in sample_rows(cmp.rows.len(), max_rows) {
        let r = &cmp.rows[i];
        let sigma = result
            .temperature_std
            .as_ref()
            .and_then(|s| s.get(i).copied())
            .map(|s| format!("{s:.2}"))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:>12.2} {:>10.1} {:>10.1} {:>10} {:>+9.2}\n",
            r.time, r.truth, r.estimate, sigma, r.error
        ));
    }

    out
}

fn submodel_list(opts: &HtOptions) -> String {
    let names: Vec<&str> = [
        (opts.absorption, "absorption"),
        (opts.conduction, "conduction"),
        (opts.evaporation, "evaporation"),
        (opts.radiation, "radiation"),
        (opts.annealing, "annealing"),
    ]
    .into_iter()
    .filter_map(|(on, name)| on.then_some(name))
    .collect();
    let mut out = if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    };
    if !opts.sensible {
        out.push_str(" (frozen cp)");
    }
    out
}

/// At most `max_rows` evenly spread indices, always including the last one.
fn sample_rows(n: usize, max_rows: usize) -> Vec<usize> {
    if n == 0 || max_rows == 0 {
        return Vec::new();
    }
    if n <= max_rows {
        return (0..n).collect();
    }
    if max_rows == 1 {
        return vec![n - 1];
    }
    let mut rows: Vec<usize> = (0..max_rows)
        .map(|k| (k as f64 * (n - 1) as f64 / (max_rows - 1) as f64).round() as usize)
        .collect();
    rows.dedup();
    rows
}

fn fmt_vec(v: &[f64], decimals: usize) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.decimals$}")).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Diagnostics;
    use crate::models::SpectroscopicOptions;
    use crate::props::{GasKind, MaterialKind};
    use crate::report::compare_temperatures;
    use ndarray::array;

    #[test]
    fn sample_rows_spans_the_record() {
        assert_eq!(sample_rows(5, 10), vec![0, 1, 2, 3, 4]);
        assert_eq!(sample_rows(101, 5), vec![0, 25, 50, 75, 100]);
        assert_eq!(sample_rows(10, 1), vec![9]);
        assert!(sample_rows(0, 4).is_empty());
    }

    #[test]
    fn simulation_summary_mentions_setup_and_peak() {
        let props = MaterialProperties::build(MaterialKind::Iron, GasKind::Argon);
        let traj = TemperatureTrajectory::single(
            vec![0.0, 10.0, 20.0],
            vec![2500.0, 3100.0, 2900.0],
            Some(vec![1.0, 0.98, 0.97]),
            None,
        );
        let text = format_simulation_summary(&props, &HtOptions::default(), &traj, &[30.0], 10);
        assert!(text.contains("Material: iron in argon"));
        assert!(text.contains("Peak temperature: 3100.0 K at t=10.00 ns"));
        assert!(text.contains("Final mass fraction: 0.9700"));
        assert!(text.contains("absorption, conduction, evaporation"));
    }

    #[test]
    fn comparison_table_has_one_line_per_row() {
        let result = PyrometryResult {
            strategy: PyrometryKind::Ratio,
            temperature: array![[3010.0], [2890.0]],
            scaling: None,
            temperature_std: Some(array![5.0, 6.0]),
            scaling_std: None,
            diagnostics: Diagnostics::default(),
        };
        let cmp = compare_temperatures(&[0.0, 1.0], &[3000.0, 2900.0], &result.mean_temperature()).unwrap();
        let text = format_comparison(&cmp, &result, 20);
        assert_eq!(text.lines().count(), 2 + 2 + 2);
        assert!(text.contains("RMSE=10.00 K"));
        assert!(text.contains("5.00"));
    }

    #[test]
    fn inversion_summary_names_strategy() {
        let model = SpectroscopicModel::new(
            MaterialProperties::build(MaterialKind::Soot, GasKind::Argon),
            SpectroscopicOptions::default(),
        )
        .unwrap();
        let result = PyrometryResult {
            strategy: PyrometryKind::Ratio,
            temperature: array![[3000.0]],
            scaling: None,
            temperature_std: None,
            scaling_std: None,
            diagnostics: Diagnostics {
                initial_temperature: 3000.0,
                degenerate: 2,
                ..Diagnostics::default()
            },
        };
        let text = format_inversion_summary(&model, &result);
        assert!(text.contains("Strategy: two-color ratio"));
        assert!(text.contains("Degenerate samples (real part kept): 2"));
        assert!(text.contains("Initial temperature: 3000.0 K"));
    }
}
