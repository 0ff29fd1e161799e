//! logger setup and export of solutions
use crate::numerical::chebfun::Chebfun;
use crate::numerical::chebfun2::Chebfun2;
use crate::numerical::errors::{SolveError, SolveResult};
use chrono::Local;
use csv::Writer;
use simplelog::*;
use std::fs::File;
use std::path::Path;

/// "debug", "info", "warn", "error", "off"; None means info
pub fn level_from_name(level: Option<&str>) -> SolveResult<LevelFilter> {
    match level {
        None => Ok(LevelFilter::Info),
        Some(name) => match name.to_ascii_lowercase().as_str() {
            "debug" => Ok(LevelFilter::Debug),
            "info" => Ok(LevelFilter::Info),
            "warn" => Ok(LevelFilter::Warn),
            "error" => Ok(LevelFilter::Error),
            "off" => Ok(LevelFilter::Off),
            other => Err(SolveError::Config(format!(
                "loglevel must be debug, info, warn, error or off, got {}",
                other
            ))),
        },
    }
}

/// Terminal logger plus, optionally, a file logger named `log_<date>_<time>.txt`.
/// A logger installed earlier stays in place.
pub fn init_logger(level: Option<&str>, to_file: bool) -> SolveResult<()> {
    let level = level_from_name(level)?;
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if to_file {
        let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let name = format!("log_{}.txt", date_and_time);
        loggers.push(WriteLogger::new(level, Config::default(), File::create(name)?));
    }
    let _ = CombinedLogger::init(loggers);
    Ok(())
}

/// solution components sampled on a uniform grid of the (common) domain, one column each
pub fn save_chebfuns_to_csv<P: AsRef<Path>>(
    path: P,
    arg: &str,
    names: &[String],
    components: &[Chebfun],
    npts: usize,
) -> SolveResult<()> {
    if names.len() != components.len() || components.is_empty() {
        return Err(SolveError::DimensionMismatch {
            what: "csv headers".to_string(),
            expected: (components.len(), 1),
            found: (names.len(), 1),
        });
    }
    let mut writer = Writer::from_path(path)?;
    let mut headers = vec![arg.to_string()];
    headers.extend(names.iter().cloned());
    writer.write_record(&headers)?;
    let (grid, _) = components[0].sample_uniform(npts);
    for x in grid {
        let mut row = vec![x.to_string()];
        row.extend(components.iter().map(|c| c.eval(x).to_string()));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// bivariate solution sampled on a uniform nx x ny grid as x, y, value rows
pub fn save_chebfun2_to_csv<P: AsRef<Path>>(
    path: P,
    f: &Chebfun2,
    nx: usize,
    ny: usize,
) -> SolveResult<()> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["x", "y", "u"])?;
    for (x, y, v) in f.sample_uniform(nx, ny) {
        writer.write_record(&[x.to_string(), y.to_string(), v.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_csv_export() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("solution.csv");
        let u = Chebfun::from_fn(|x| x * x, (0.0, 1.0));
        let v = Chebfun::identity((0.0, 1.0));
        save_chebfuns_to_csv(&path, "x", &["u".to_string(), "v".to_string()], &[u, v], 11).unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["x", "u", "v"]);
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 11);
        let last_u: f64 = rows[10][1].parse().unwrap();
        assert!((last_u - 1.0).abs() < 1e-13);
    }

    #[test]
    fn test_csv_export_2d_and_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("field.csv");
        let f = Chebfun2::from_fn(|x, y| x + y, [0.0, 1.0, 0.0, 1.0]);
        save_chebfun2_to_csv(&path, &f, 4, 3).unwrap();
        let reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.into_records().count(), 12);
        let bad = save_chebfuns_to_csv(dir.path().join("bad.csv"), "x", &[], &[Chebfun::zeros((0.0, 1.0))], 3);
        assert!(bad.is_err());
    }

    #[test]
    fn test_level_names() {
        assert_eq!(level_from_name(Some("WARN")).unwrap(), LevelFilter::Warn);
        assert_eq!(level_from_name(None).unwrap(), LevelFilter::Info);
        assert!(level_from_name(Some("loud")).is_err());
    }
}
