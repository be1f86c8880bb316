//! The `gradebook formula` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use gradebook_core::binding::Bindings;
use gradebook_core::formula::Formula;
use gradebook_core::statistics::round2;
use gradebook_store::config::load_config_from;

use super::load_engine;

pub async fn execute(
    expression: String,
    vars: Vec<String>,
    dataset: Option<PathBuf>,
    teacher: Option<String>,
    unit: Option<String>,
    class: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let Some(dataset) = dataset else {
        return evaluate(&expression, &vars);
    };

    let teacher = teacher.context("--teacher is required with --dataset")?;
    let config = load_config_from(config_path.as_deref())?;
    let engine = load_engine(&dataset, &config)?;

    let check = match (unit, class) {
        (Some(unit), None) => engine.check_unit_formula(&teacher, &unit, &expression).await?,
        (None, Some(class)) => {
            engine
                .check_class_formula(&teacher, &class, &expression)
                .await?
        }
        _ => anyhow::bail!("exactly one of --unit or --class is required with --dataset"),
    };

    println!("Formula OK: {expression}");
    println!("  references: {}", check.variables_referenced.join(", "));
    println!("  available:  {}", check.variables_available.join(", "));
    Ok(())
}

fn evaluate(expression: &str, vars: &[String]) -> Result<()> {
    let bindings = parse_vars(vars)?;
    let formula = Formula::parse(expression)
        .with_context(|| format!("invalid formula \"{expression}\""))?;
    let value = formula
        .evaluate(&bindings)
        .with_context(|| format!("failed to evaluate \"{expression}\""))?;

    println!("{}", round2(value));
    Ok(())
}

/// Parse `NAME=VALUE` pairs.
fn parse_vars(vars: &[String]) -> Result<Bindings> {
    vars.iter()
        .map(|pair| {
            let (name, value) = pair
                .split_once('=')
                .with_context(|| format!("invalid --var '{pair}': expected NAME=VALUE"))?;
            let value: f64 = value
                .trim()
                .parse()
                .with_context(|| format!("invalid value in --var '{pair}'"))?;
            Ok((name.trim().to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_vars_pairs() {
        let bindings = parse_vars(&["N1=8".into(), " lab = 6.5".into()]).unwrap();
        assert_eq!(bindings["N1"], 8.0);
        assert_eq!(bindings["lab"], 6.5);
    }

    #[test]
    fn parse_vars_rejects_malformed() {
        assert!(parse_vars(&["N1".into()]).is_err());
        assert!(parse_vars(&["N1=abc".into()]).is_err());
    }
}
