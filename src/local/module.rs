use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::config::SwipeConfig;
use crate::error::SwipeError;
use crate::hardware::{EchoLine, EdgeEvent, GpioBackend, Sleeper, ThreadSleeper};
use crate::processing::sink::ResultSink;
use crate::processing::swipe_detector::{Mode, SwipeDetector};
use crate::processing::Side;
use crate::utils::log::{console, console_error, log_to_file};

type EdgeMessage = (Side, Result<EdgeEvent, SwipeError>);
type WorkerOutput = (SwipeDetector, Result<(), SwipeError>);

/// Inbound messages from the host.
#[derive(Debug, Clone)]
pub enum ControlMessage {
    Configure(SwipeConfig),
    Start,
    Stop,
    Status(String),
}

struct Worker {
    control: Sender<()>,
    handle: JoinHandle<WorkerOutput>,
}

// -----------------------------------------------------------------------------
// SWIPE MODULE
// -----------------------------------------------------------------------------

/// Host-facing listener. Owns the GPIO lines for its whole lifetime and runs
/// the detector on one worker thread while started.
pub struct SwipeModule {
    backend: Box<dyn GpioBackend>,
    sink: Option<Box<dyn ResultSink>>,
    sleeper: Arc<dyn Sleeper>,
    config: Option<SwipeConfig>,
    echo_lines: Vec<(Side, Box<dyn EchoLine>)>,
    detector: Option<SwipeDetector>,
    worker: Option<Worker>,
    mode: Arc<Mutex<Mode>>,
}

impl SwipeModule {
    pub fn new(backend: Box<dyn GpioBackend>, sink: Box<dyn ResultSink>) -> Self {
        Self::with_sleeper(backend, sink, Arc::new(ThreadSleeper))
    }

    pub fn with_sleeper(
        backend: Box<dyn GpioBackend>,
        sink: Box<dyn ResultSink>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            backend,
            sink: Some(sink),
            sleeper,
            config: None,
            echo_lines: Vec::new(),
            detector: None,
            worker: None,
            mode: Arc::new(Mutex::new(Mode::Off)),
        }
    }

    pub fn handle(&mut self, message: ControlMessage) -> Result<(), SwipeError> {
        match message {
            ControlMessage::Configure(config) => self.configure(config),
            ControlMessage::Start => self.start(),
            ControlMessage::Stop => self.stop(),
            ControlMessage::Status(message) => {
                self.status(&message);
                Ok(())
            }
        }
    }

    /// Applies the configuration once; later calls only honour `auto_start`.
    pub fn configure(&mut self, config: SwipeConfig) -> Result<(), SwipeError> {
        if self.config.is_none() {
            config.validate()?;
            self.setup_listener(&config)?;
            self.config = Some(config);
        }
        let auto_start = self
            .config
            .as_ref()
            .map_or(false, |config| config.session.auto_start);
        if auto_start {
            self.start()?;
        }
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), SwipeError> {
        if let Some(worker) = &self.worker {
            if !worker.handle.is_finished() {
                return Ok(());
            }
            // the worker died on a fatal error; reap it so the error reaches
            // the caller and the next start begins a fresh session
            self.stop()?;
        }
        let mut detector = self.detector.take().ok_or(SwipeError::NotConfigured)?;

        let (edge_tx, edge_rx) = unbounded::<EdgeMessage>();
        if let Err(e) = self.watch_lines(&edge_tx) {
            self.unwatch_lines();
            self.detector = Some(detector);
            return Err(e);
        }
        drop(edge_tx);

        detector.start();
        *self.mode.lock().unwrap_or_else(|p| p.into_inner()) = detector.mode();

        let (control_tx, control_rx) = bounded(1);
        let mode = Arc::clone(&self.mode);
        let handle = thread::spawn(move || run_worker(detector, edge_rx, control_rx, mode));
        self.worker = Some(Worker {
            control: control_tx,
            handle,
        });

        console("Listeners set up and started");
        self.log_session("started");
        Ok(())
    }

    /// Deregisters both watchers and stops sampling. Safe to call repeatedly;
    /// a fatal error hit by the worker is returned once.
    pub fn stop(&mut self) -> Result<(), SwipeError> {
        let worker = match self.worker.take() {
            Some(worker) => worker,
            None => return Ok(()),
        };

        self.unwatch_lines();
        let _ = worker.control.send(());
        let joined = worker.handle.join();
        *self.mode.lock().unwrap_or_else(|p| p.into_inner()) = Mode::Off;

        let (mut detector, result) = joined.map_err(|_| SwipeError::WorkerPanicked)?;
        detector.stop();
        self.detector = Some(detector);
        console("Listeners stopped");
        match &result {
            Ok(()) => self.log_session("stopped"),
            Err(e) => self.log_session(&format!("stopped with error: {}", e)),
        }
        result
    }

    pub fn status(&self, message: &str) {
        console(message);
    }

    /// False once the worker has exited, even before `stop()` reaps it.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .map_or(false, |worker| !worker.handle.is_finished())
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    pub fn mode(&self) -> Mode {
        *self.mode.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn log_session(&self, event: &str) {
        let enabled = self
            .config
            .as_ref()
            .map_or(false, |config| config.session.enable_debug_logging);
        if enabled {
            if let Err(e) = log_to_file("session.log", event) {
                console_error(&format!("failed to log session event: {}", e));
            }
        }
    }

    fn setup_listener(&mut self, config: &SwipeConfig) -> Result<(), SwipeError> {
        let trigger = self.backend.output(config.pins.trigger)?;
        let mut echo_lines = Vec::with_capacity(2);
        for side in Side::BOTH {
            echo_lines.push((side, self.backend.input(config.echo_pin(side))?));
        }
        let sink = self.sink.take().ok_or(SwipeError::NotConfigured)?;
        if config.session.verbose {
            let echo_pins = echo_lines
                .iter()
                .map(|(side, line)| format!("{} {}", side, line.pin()))
                .collect::<Vec<String>>()
                .join(", ");
            console(&format!("trigger on pin {}, echo on {}", trigger.pin(), echo_pins));
        }

        self.echo_lines = echo_lines;
        self.detector = Some(SwipeDetector::new(
            config.clone(),
            trigger,
            sink,
            Arc::clone(&self.sleeper),
        ));
        Ok(())
    }

    fn watch_lines(&mut self, edge_tx: &Sender<EdgeMessage>) -> Result<(), SwipeError> {
        for (side, line) in self.echo_lines.iter_mut() {
            let side = *side;
            let tx = edge_tx.clone();
            line.watch(Box::new(move |event| {
                let _ = tx.send((side, event));
            }))?;
        }
        Ok(())
    }

    fn unwatch_lines(&mut self) {
        for (side, line) in self.echo_lines.iter_mut() {
            if let Err(e) = line.unwatch() {
                console_error(&format!(
                    "failed to unwatch {} echo line (pin {}): {}",
                    side,
                    line.pin(),
                    e
                ));
            }
        }
    }
}

impl Drop for SwipeModule {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            console_error(&format!("listener stopped with error: {}", e));
        }
    }
}

// -----------------------------------------------------------------------------
// WORKER
// -----------------------------------------------------------------------------

fn run_worker(
    mut detector: SwipeDetector,
    edges: Receiver<EdgeMessage>,
    control: Receiver<()>,
    mode: Arc<Mutex<Mode>>,
) -> WorkerOutput {
    let result = event_loop(&mut detector, &edges, &control, &mode);
    if let Err(e) = &result {
        console_error(&format!("detection stopped: {}", e));
        detector.stop();
        *mode.lock().unwrap_or_else(|p| p.into_inner()) = Mode::Off;
    }
    (detector, result)
}

/// Serializes trigger ticks and echo edges onto this thread so the detector
/// is never mutated concurrently.
fn event_loop(
    detector: &mut SwipeDetector,
    edges: &Receiver<EdgeMessage>,
    control: &Receiver<()>,
    mode: &Mutex<Mode>,
) -> Result<(), SwipeError> {
    loop {
        // the schedule changes when a gesture window opens or closes
        let ticks = detector.ticks();
        select! {
            recv(control) -> _ => return Ok(()),
            recv(edges) -> message => match message {
                Ok((side, event)) => detector.handle_edge(side, event)?,
                Err(_) => return Ok(()),
            },
            recv(ticks) -> _ => detector.handle_tick()?,
        }
        *mode.lock().unwrap_or_else(|p| p.into_inner()) = detector.mode();
    }
}
