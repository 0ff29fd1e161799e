//! progress reporting of the Newton iteration
use crate::numerical::chebfun::Chebfun;
use log::info;
use std::thread;
use std::time::Duration;

/// diagnostics of one finished Newton step
#[derive(Debug, Clone)]
pub struct IterationReport<'a> {
    pub iteration: usize,
    pub iterate: &'a [Chebfun],
    pub update_norm: f64,
    pub error_estimate: f64,
    pub lambda: f64,
    pub residual_norm: f64,
    pub dimension: usize,
}

/// Called synchronously by the Newton solver; nothing returned by an observer changes the
/// iteration.
pub trait ProgressObserver {
    fn on_iteration_start(&mut self, _iteration: usize, _iterate: &[Chebfun]) {}
    fn on_iteration_end(&mut self, _report: &IterationReport) {}
}

pub struct NoDisplay;

impl ProgressObserver for NoDisplay {}

/// logs every step and optionally pauses after it
pub struct LogDisplay {
    pause: Option<Duration>,
}

impl LogDisplay {
    pub fn new(pause_ms: u64) -> Self {
        LogDisplay {
            pause: if pause_ms > 0 {
                Some(Duration::from_millis(pause_ms))
            } else {
                None
            },
        }
    }
}

impl ProgressObserver for LogDisplay {
    fn on_iteration_start(&mut self, iteration: usize, iterate: &[Chebfun]) {
        let lengths: Vec<usize> = iterate.iter().map(|c| c.len()).collect();
        info!("Newton iteration {} starts, coefficient lengths {:?}", iteration, lengths);
    }

    fn on_iteration_end(&mut self, report: &IterationReport) {
        info!(
            "iteration {:>3} | update norm {:.3e} | error estimate {:.3e} | lambda {:.3} | residual {:.3e} | n = {}",
            report.iteration,
            report.update_norm,
            report.error_estimate,
            report.lambda,
            report.residual_norm,
            report.dimension
        );
        if let Some(pause) = self.pause {
            thread::sleep(pause);
        }
    }
}

/// collects the reports, used to inspect a solve afterwards
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub started: Vec<usize>,
    pub update_norms: Vec<f64>,
}

impl ProgressObserver for RecordingDisplay {
    fn on_iteration_start(&mut self, iteration: usize, _iterate: &[Chebfun]) {
        self.started.push(iteration);
    }

    fn on_iteration_end(&mut self, report: &IterationReport) {
        self.update_norms.push(report.update_norm);
    }
}
