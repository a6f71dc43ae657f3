//! Simulated MMAL backend
//!
//! A software stand-in for `vc.ril.source` that behaves like the firmware
//! component as far as the component/port/pool contract goes: format
//! validation and alignment, negotiated buffer requirements, a buffer pool,
//! and a dedicated driver thread that fills buffers and invokes the port
//! callback from outside the caller's thread.
//!
//! Every call is recorded in a [`SimJournal`] and any call can be made to
//! fail with a chosen [`MmalStatus`], which is what the capture sequence
//! tests are built on.
//!
//! # Threading
//!
//! ```text
//! caller thread                       driver thread ("sim-vc.ril.source")
//! ─────────────                       ───────────────────────────────────
//! enable(callback) ──── spawn ──────> wait for commands
//! send_buffer(hdr) ──── Fill(hdr) ──> fill pattern, callback(FilledBuffer),
//!                                     release hdr to its pool
//! disable() ─────────── Stop ───────> return held buffers, exit
//!           <────────── join ────────
//! ```

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::buffer::{BufferCallback, BufferFlags, BufferHeader, FilledBuffer};
use crate::component::{
    BufferPool, BufferRequirements, ComponentFactory, MediaComponent, OutputPort, SOURCE_COMPONENT,
};
use crate::error::{MmalError, MmalStatus, Result};
use crate::format::VideoFormat;
use crate::param::{PortParameter, SourcePattern};
use crate::pattern;

/// Frame period used for presentation timestamps (30 fps), in microseconds
const FRAME_PERIOD_US: i64 = 33_333;

/// Calls recorded by the simulated backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimCall {
    ComponentCreate,
    FormatCommit,
    ParameterSet,
    PoolCreate,
    PortEnable,
    SendBuffer,
    PortDisable,
    PoolDestroy,
    ComponentDestroy,
    Shutdown,
}

impl SimCall {
    /// The MMAL function this call stands for
    #[must_use]
    pub fn api_name(self) -> &'static str {
        match self {
            Self::ComponentCreate => "mmal_component_create",
            Self::FormatCommit => "mmal_port_format_commit",
            Self::ParameterSet => "mmal_port_parameter_set",
            Self::PoolCreate => "mmal_port_pool_create",
            Self::PortEnable => "mmal_port_enable",
            Self::SendBuffer => "mmal_port_send_buffer",
            Self::PortDisable => "mmal_port_disable",
            Self::PoolDestroy => "mmal_port_pool_destroy",
            Self::ComponentDestroy => "mmal_component_destroy",
            Self::Shutdown => "mmal_vc_deinit",
        }
    }
}

/// Shared, ordered record of calls made against the simulated backend
#[derive(Debug, Clone, Default)]
pub struct SimJournal {
    calls: Arc<Mutex<Vec<SimCall>>>,
}

impl SimJournal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: SimCall) {
        self.calls.lock().push(call);
    }

    /// All calls in the order they were made
    #[must_use]
    pub fn calls(&self) -> Vec<SimCall> {
        self.calls.lock().clone()
    }

    /// Number of times `call` was made
    #[must_use]
    pub fn count(&self, call: SimCall) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }

    /// Whether `call` was made at least once
    #[must_use]
    pub fn contains(&self, call: SimCall) -> bool {
        self.count(call) > 0
    }

    /// Index of the first occurrence of `call`
    #[must_use]
    pub fn position(&self, call: SimCall) -> Option<usize> {
        self.calls.lock().iter().position(|c| *c == call)
    }
}

/// Behaviour of the simulated source
#[derive(Debug, Clone)]
pub struct SimSourceConfig {
    /// Minimum buffer count reported after commit (default: 1)
    pub buffer_num_min: u32,

    /// Recommended buffer count reported after commit (default: 3)
    pub buffer_num_recommended: u32,

    /// How many buffers the driver fills before holding the rest (default: 1)
    ///
    /// `None` fills every buffer it is sent, like a free-running camera.
    pub frames_to_emit: Option<u32>,

    /// Simulated capture time per frame (default: 10ms)
    pub frame_interval: Duration,

    /// Seed for the random patterns (default: none, random seed)
    pub seed: Option<u64>,

    /// Calls that fail with the given status
    pub faults: Vec<(SimCall, MmalStatus)>,
}

impl Default for SimSourceConfig {
    fn default() -> Self {
        Self {
            buffer_num_min: 1,
            buffer_num_recommended: 3,
            frames_to_emit: Some(1),
            frame_interval: Duration::from_millis(10),
            seed: None,
            faults: Vec::new(),
        }
    }
}

impl SimSourceConfig {
    /// Make `call` fail with `status`
    #[must_use]
    pub fn with_fault(mut self, call: SimCall, status: MmalStatus) -> Self {
        self.faults.push((call, status));
        self
    }

    /// Set how many buffers get filled (`None` for all)
    #[must_use]
    pub fn with_frames_to_emit(mut self, frames: Option<u32>) -> Self {
        self.frames_to_emit = frames;
        self
    }

    /// Set the recommended buffer count
    #[must_use]
    pub fn with_buffer_num(mut self, num: u32) -> Self {
        self.buffer_num_recommended = num;
        self
    }

    /// Set the simulated capture time per frame
    #[must_use]
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Seed the pattern generator
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn fault(&self, call: SimCall) -> Option<MmalStatus> {
        self.faults
            .iter()
            .find(|(c, _)| *c == call)
            .map(|(_, status)| *status)
    }
}

/// Record `call` and fail it if a fault is configured
fn enter(config: &SimSourceConfig, journal: &SimJournal, call: SimCall) -> Result<()> {
    journal.record(call);
    match config.fault(call) {
        Some(status) => {
            debug!("Injecting {} into {}", status.name(), call.api_name());
            Err(MmalError::status(call.api_name(), status))
        }
        None => Ok(()),
    }
}

/// Factory for simulated components
#[derive(Debug, Clone, Default)]
pub struct SimFactory {
    config: Arc<SimSourceConfig>,
    journal: SimJournal,
}

impl SimFactory {
    #[must_use]
    pub fn new(config: SimSourceConfig) -> Self {
        Self {
            config: Arc::new(config),
            journal: SimJournal::new(),
        }
    }

    /// Factory with default behaviour
    #[must_use]
    pub fn with_default() -> Self {
        Self::new(SimSourceConfig::default())
    }

    /// Journal shared by every component this factory creates
    #[must_use]
    pub fn journal(&self) -> SimJournal {
        self.journal.clone()
    }
}

impl ComponentFactory for SimFactory {
    type Component = SimComponent;

    fn create(&self, name: &str) -> Result<SimComponent> {
        enter(&self.config, &self.journal, SimCall::ComponentCreate)?;

        if name != SOURCE_COMPONENT {
            return Err(MmalError::status(SimCall::ComponentCreate.api_name(), MmalStatus::NotFound));
        }

        info!("Created simulated component {}", name);
        Ok(SimComponent {
            name: name.to_string(),
            outputs: vec![SimPort::new(format!("{name}:out:0"), self.config.clone(), self.journal.clone())],
            config: self.config.clone(),
            journal: self.journal.clone(),
        })
    }

    fn shutdown(&mut self) -> Result<()> {
        enter(&self.config, &self.journal, SimCall::Shutdown)?;
        debug!("Simulated service released");
        Ok(())
    }
}

/// Simulated `vc.ril.source` component with one output port
#[derive(Debug)]
pub struct SimComponent {
    name: String,
    outputs: Vec<SimPort>,
    config: Arc<SimSourceConfig>,
    journal: SimJournal,
}

impl MediaComponent for SimComponent {
    type Port = SimPort;

    fn name(&self) -> &str {
        &self.name
    }

    fn output_count(&self) -> usize {
        self.outputs.len()
    }

    fn output(&mut self, index: usize) -> Option<&mut SimPort> {
        self.outputs.get_mut(index)
    }

    fn destroy(mut self) -> Result<()> {
        enter(&self.config, &self.journal, SimCall::ComponentDestroy)?;

        for port in &mut self.outputs {
            if port.is_enabled() {
                warn!("Destroying {} with port {} still enabled", self.name, port.name);
                port.stop_driver();
            }
        }

        info!("Destroyed simulated component {}", self.name);
        Ok(())
    }
}

/// Simulated output port
#[derive(Debug)]
pub struct SimPort {
    name: String,
    format: VideoFormat,
    requirements: BufferRequirements,
    buffer_num: u32,
    buffer_size: u32,
    committed: bool,
    pattern: SourcePattern,
    zero_copy: bool,
    config: Arc<SimSourceConfig>,
    journal: SimJournal,
    driver: Option<Driver>,
}

impl SimPort {
    fn new(name: String, config: Arc<SimSourceConfig>, journal: SimJournal) -> Self {
        Self {
            name,
            format: VideoFormat::default(),
            requirements: BufferRequirements::default(),
            buffer_num: 0,
            buffer_size: 0,
            committed: false,
            pattern: SourcePattern::default(),
            zero_copy: false,
            config,
            journal,
            driver: None,
        }
    }

    /// Pattern currently selected
    #[must_use]
    pub fn pattern(&self) -> SourcePattern {
        self.pattern
    }

    /// Whether zero-copy was requested
    #[must_use]
    pub fn zero_copy(&self) -> bool {
        self.zero_copy
    }

    fn stop_driver(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.stop();
        }
    }

    fn validate(&self) -> Result<u32> {
        let call = SimCall::FormatCommit.api_name();
        let format = &self.format;

        if format.encoding.bytes_per_pixel().is_none() {
            debug!("{}: unsupported encoding {}", self.name, format.encoding);
            return Err(MmalError::status(call, MmalStatus::NotImplemented));
        }
        if format.width == 0 || format.height == 0 || !format.is_aligned() {
            debug!("{}: bad dimensions {}x{}", self.name, format.width, format.height);
            return Err(MmalError::status(call, MmalStatus::Invalid));
        }
        if !format.crop.fits_within(format.width, format.height) {
            debug!("{}: crop {:?} outside frame", self.name, format.crop);
            return Err(MmalError::status(call, MmalStatus::Invalid));
        }

        format
            .frame_size()
            .ok_or_else(|| MmalError::status(call, MmalStatus::Invalid))
    }
}

impl OutputPort for SimPort {
    type Pool = SimPool;

    fn name(&self) -> &str {
        &self.name
    }

    fn format(&self) -> &VideoFormat {
        &self.format
    }

    fn format_mut(&mut self) -> &mut VideoFormat {
        &mut self.format
    }

    fn commit_format(&mut self) -> Result<()> {
        enter(&self.config, &self.journal, SimCall::FormatCommit)?;

        if self.is_enabled() {
            return Err(MmalError::status(SimCall::FormatCommit.api_name(), MmalStatus::IsConnected));
        }

        let frame_size = self.validate()?;
        self.requirements = BufferRequirements {
            num_min: self.config.buffer_num_min,
            size_min: frame_size,
            num_recommended: self.config.buffer_num_recommended.max(self.config.buffer_num_min),
            size_recommended: frame_size,
        };
        self.buffer_num = self.requirements.num_recommended;
        self.buffer_size = self.requirements.size_recommended;
        self.committed = true;

        info!(
            "{}: committed {} {}x{} crop {:?}, {} x {} bytes",
            self.name,
            self.format.encoding,
            self.format.width,
            self.format.height,
            self.format.crop,
            self.buffer_num,
            self.buffer_size
        );
        Ok(())
    }

    fn set_parameter(&mut self, parameter: PortParameter) -> Result<()> {
        enter(&self.config, &self.journal, SimCall::ParameterSet)?;

        match parameter {
            PortParameter::SourcePattern(pattern) => self.pattern = pattern,
            PortParameter::ZeroCopy(enable) => {
                if self.is_enabled() {
                    return Err(MmalError::status(SimCall::ParameterSet.api_name(), MmalStatus::IsConnected));
                }
                self.zero_copy = enable;
            }
        }

        debug!("{}: set {} = {:?}", self.name, parameter.name(), parameter);
        Ok(())
    }

    fn buffer_requirements(&self) -> BufferRequirements {
        self.requirements
    }

    fn buffer_num(&self) -> u32 {
        self.buffer_num
    }

    fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    fn create_pool(&mut self, num: u32, size: u32) -> Result<SimPool> {
        if enter(&self.config, &self.journal, SimCall::PoolCreate).is_err() || num == 0 {
            return Err(MmalError::PoolCreation { num, size });
        }

        debug!("{}: created pool of {} x {} bytes", self.name, num, size);
        Ok(SimPool::new(num as usize, size as usize))
    }

    fn enable(&mut self, callback: BufferCallback) -> Result<()> {
        enter(&self.config, &self.journal, SimCall::PortEnable)?;

        let call = SimCall::PortEnable.api_name();
        if self.is_enabled() {
            return Err(MmalError::status(call, MmalStatus::IsConnected));
        }
        if !self.committed {
            return Err(MmalError::status(call, MmalStatus::NotConfigured));
        }

        let driver = Driver::spawn(
            format!("sim-{}", SOURCE_COMPONENT),
            self.format,
            self.pattern,
            self.config.clone(),
            callback,
        )
        .map_err(|e| {
            error!("{}: failed to spawn driver thread: {}", self.name, e);
            MmalError::status(call, MmalStatus::NoSpace)
        })?;

        self.driver = Some(driver);
        info!("{}: enabled", self.name);
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.driver.is_some()
    }

    fn send_buffer(&mut self, header: SimBuffer) -> Result<()> {
        enter(&self.config, &self.journal, SimCall::SendBuffer)?;

        let call = SimCall::SendBuffer.api_name();
        let Some(driver) = self.driver.as_ref() else {
            return Err(MmalError::status(call, MmalStatus::Invalid));
        };
        if header.alloc_size() < self.buffer_size {
            return Err(MmalError::invalid_parameter(format!(
                "buffer {} holds {} bytes, port needs {}",
                header.index,
                header.alloc_size(),
                self.buffer_size
            )));
        }

        debug!("{}: sent header {}", self.name, header.index);
        driver
            .commands
            .send(DriverCommand::Fill(header))
            .map_err(|_| MmalError::status(call, MmalStatus::Io))
    }

    fn disable(&mut self) -> Result<()> {
        enter(&self.config, &self.journal, SimCall::PortDisable)?;

        if !self.is_enabled() {
            return Err(MmalError::status(SimCall::PortDisable.api_name(), MmalStatus::Invalid));
        }

        self.stop_driver();
        info!("{}: disabled", self.name);
        Ok(())
    }

    fn destroy_pool(&mut self, pool: SimPool) {
        self.journal.record(SimCall::PoolDestroy);

        let missing = pool.headers_num() - pool.queue_length();
        if missing > 0 {
            warn!("{}: destroying pool with {} buffers still in flight", self.name, missing);
        }
        debug!("{}: destroyed pool", self.name);
    }
}

impl Drop for SimPort {
    fn drop(&mut self) {
        self.stop_driver();
    }
}

#[derive(Debug)]
struct PoolShared {
    queue: Mutex<VecDeque<SimBuffer>>,
    headers_num: usize,
}

/// Simulated buffer pool
#[derive(Debug)]
pub struct SimPool {
    shared: Arc<PoolShared>,
}

impl SimPool {
    fn new(num: usize, size: usize) -> Self {
        let shared = Arc::new_cyclic(|home: &Weak<PoolShared>| PoolShared {
            queue: Mutex::new(
                (0..num)
                    .map(|index| SimBuffer {
                        index,
                        data: vec![0u8; size],
                        length: 0,
                        flags: BufferFlags::empty(),
                        pts: None,
                        home: home.clone(),
                    })
                    .collect(),
            ),
            headers_num: num,
        });
        Self { shared }
    }
}

impl BufferPool for SimPool {
    type Header = SimBuffer;

    fn headers_num(&self) -> usize {
        self.shared.headers_num
    }

    fn queue_length(&self) -> usize {
        self.shared.queue.lock().len()
    }

    fn get(&self) -> Option<SimBuffer> {
        self.shared.queue.lock().pop_front()
    }
}

/// Simulated buffer header
#[derive(Debug)]
pub struct SimBuffer {
    index: usize,
    data: Vec<u8>,
    length: u32,
    flags: BufferFlags,
    pts: Option<i64>,
    home: Weak<PoolShared>,
}

impl SimBuffer {
    /// Return the header to its pool, `mmal_buffer_header_release`
    ///
    /// Dropped silently if the pool is already gone.
    fn release(mut self) {
        self.length = 0;
        self.flags = BufferFlags::empty();
        self.pts = None;
        if let Some(pool) = self.home.upgrade() {
            pool.queue.lock().push_back(self);
        }
    }
}

impl BufferHeader for SimBuffer {
    fn index(&self) -> usize {
        self.index
    }

    fn alloc_size(&self) -> u32 {
        self.data.len() as u32
    }

    fn length(&self) -> u32 {
        self.length
    }

    fn flags(&self) -> BufferFlags {
        self.flags
    }
}

enum DriverCommand {
    Fill(SimBuffer),
    Stop,
}

/// Handle to the simulated driver thread
struct Driver {
    commands: mpsc::Sender<DriverCommand>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish()
    }
}

impl Driver {
    fn spawn(
        name: String,
        format: VideoFormat,
        pattern: SourcePattern,
        config: Arc<SimSourceConfig>,
        callback: BufferCallback,
    ) -> std::io::Result<Self> {
        let (commands, rx) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let state = DriverState {
            format,
            pattern,
            rng: config.seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed),
            config,
            callback,
            emitted: 0,
            held: Vec::new(),
        };

        let thread = thread::Builder::new().name(name).spawn(move || state.run(rx))?;

        Ok(Self {
            commands,
            running,
            thread: Some(thread),
        })
    }

    /// Flush and stop the thread; no callback runs after this returns
    ///
    /// Buffers sent before the stop are still completed if the source emits
    /// them, the rest go back to the pool unfilled.
    fn stop(mut self) {
        // The thread may already have exited; the join below is what matters
        let _ = self.commands.send(DriverCommand::Stop);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Simulated driver thread panicked");
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

struct DriverState {
    format: VideoFormat,
    pattern: SourcePattern,
    rng: fastrand::Rng,
    config: Arc<SimSourceConfig>,
    callback: BufferCallback,
    emitted: u32,
    held: Vec<SimBuffer>,
}

impl DriverState {
    fn run(mut self, rx: mpsc::Receiver<DriverCommand>) {
        debug!("Simulated driver thread started");

        while let Ok(command) = rx.recv() {
            match command {
                DriverCommand::Fill(buffer) => self.fill(buffer),
                DriverCommand::Stop => break,
            }
        }

        // Buffers the driver never completed go back to the pool on disable
        let held = self.held.len();
        for buffer in self.held.drain(..) {
            buffer.release();
        }
        while let Ok(DriverCommand::Fill(buffer)) = rx.try_recv() {
            buffer.release();
        }

        debug!("Simulated driver thread exiting ({} emitted, {} returned held)", self.emitted, held);
    }

    fn fill(&mut self, mut buffer: SimBuffer) {
        let wanted = self.config.frames_to_emit.map_or(true, |n| self.emitted < n);
        if !wanted {
            self.held.push(buffer);
            return;
        }

        if !self.config.frame_interval.is_zero() {
            thread::sleep(self.config.frame_interval);
        }

        let frame = u64::from(self.emitted);
        match pattern::fill(self.pattern, &self.format, frame, &mut self.rng, &mut buffer.data) {
            Some(len) => {
                buffer.length = len as u32;
                buffer.flags = BufferFlags::FRAME;
            }
            None => {
                buffer.length = 0;
                buffer.flags = BufferFlags::FRAME | BufferFlags::CORRUPTED;
            }
        }
        buffer.pts = Some(i64::from(self.emitted) * FRAME_PERIOD_US);
        self.emitted += 1;

        let filled = FilledBuffer {
            index: buffer.index,
            data: &buffer.data[..buffer.length as usize],
            flags: buffer.flags,
            pts: buffer.pts,
            alloc_size: buffer.data.len() as u32,
        };
        debug!(
            "Buffer {} filled {} bytes, flags {:#010x}",
            filled.index,
            filled.length(),
            filled.flags.bits()
        );

        let callback = &mut self.callback;
        if panic::catch_unwind(AssertUnwindSafe(|| callback(filled))).is_err() {
            error!("Port callback panicked on buffer {}", buffer.index);
        }

        buffer.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Encoding, Rect};
    use std::sync::mpsc::sync_channel;

    fn configured_port(component: &mut SimComponent) -> &mut SimPort {
        let port = component.output(0).expect("output 0");
        *port.format_mut() = VideoFormat::for_frame(Encoding::RGBA, 128, 128);
        port.commit_format().expect("commit");
        port
    }

    fn quick() -> SimSourceConfig {
        SimSourceConfig::default()
            .with_frame_interval(Duration::ZERO)
            .with_seed(42)
    }

    #[test]
    fn test_unknown_component() {
        let factory = SimFactory::with_default();
        let err = factory.create("vc.ril.camera").expect_err("unknown component");
        assert_eq!(err.status_code(), Some(MmalStatus::NotFound.code()));
    }

    #[test]
    fn test_commit_reports_requirements() {
        let factory = SimFactory::new(quick().with_buffer_num(4));
        let mut component = factory.create(SOURCE_COMPONENT).expect("create");
        let port = configured_port(&mut component);

        assert_eq!(port.format().width, 128);
        assert_eq!(port.format().height, 128);
        assert_eq!(port.format().crop, Rect::new(0, 0, 128, 128));
        assert_eq!(port.buffer_num(), 4);
        assert_eq!(port.buffer_size(), 128 * 128 * 4);
        assert_eq!(port.buffer_requirements().num_min, 1);
    }

    #[test]
    fn test_commit_rejects_unaligned_and_planar() {
        let factory = SimFactory::new(quick());
        let mut component = factory.create(SOURCE_COMPONENT).expect("create");
        let port = component.output(0).expect("output 0");

        *port.format_mut() = VideoFormat::for_frame(Encoding::RGBA, 100, 100);
        port.format_mut().width = 100;
        let err = port.commit_format().expect_err("unaligned width");
        assert_eq!(err.status_code(), Some(MmalStatus::Invalid.code()));

        *port.format_mut() = VideoFormat::for_frame(Encoding::I420, 64, 64);
        let err = port.commit_format().expect_err("planar");
        assert_eq!(err.status_code(), Some(MmalStatus::NotImplemented.code()));
    }

    #[test]
    fn test_pool_matches_request() {
        let factory = SimFactory::new(quick());
        let mut component = factory.create(SOURCE_COMPONENT).expect("create");
        let port = configured_port(&mut component);

        let pool = port.create_pool(port.buffer_num(), port.buffer_size()).expect("pool");
        assert_eq!(pool.headers_num(), 3);
        assert_eq!(pool.queue_length(), 3);

        let header = pool.get().expect("header");
        assert_eq!(header.alloc_size(), 128 * 128 * 4);
        assert_eq!(pool.queue_length(), 2);
        header.release();
        assert_eq!(pool.queue_length(), 3);
    }

    #[test]
    fn test_send_before_enable_fails() {
        let factory = SimFactory::new(quick());
        let mut component = factory.create(SOURCE_COMPONENT).expect("create");
        let port = configured_port(&mut component);
        let pool = port.create_pool(1, port.buffer_size()).expect("pool");

        let header = pool.get().expect("header");
        assert!(port.send_buffer(header).is_err());
    }

    #[test]
    fn test_enable_fill_disable() {
        let factory = SimFactory::new(quick().with_frames_to_emit(Some(1)));
        let journal = factory.journal();
        let mut component = factory.create(SOURCE_COMPONENT).expect("create");
        let port = configured_port(&mut component);
        port.set_parameter(PortParameter::SourcePattern(SourcePattern::Random)).expect("pattern");
        port.set_parameter(PortParameter::ZeroCopy(false)).expect("zero copy");

        let pool = port.create_pool(port.buffer_num(), port.buffer_size()).expect("pool");
        let (tx, rx) = sync_channel(4);
        port.enable(Box::new(move |buffer: FilledBuffer<'_>| {
            let _ = tx.try_send((buffer.length(), buffer.flags, thread::current().name().map(String::from)));
        }))
        .expect("enable");

        while let Some(header) = pool.get() {
            port.send_buffer(header).expect("send");
        }

        let (length, flags, thread_name) = rx.recv_timeout(Duration::from_secs(5)).expect("callback");
        assert_eq!(length, 128 * 128 * 4);
        assert!(flags.is_complete_frame());
        assert_eq!(thread_name.as_deref(), Some("sim-vc.ril.source"));

        port.disable().expect("disable");
        // Only one frame was emitted
        assert!(rx.try_recv().is_err());
        // Every header is back in the pool after disable
        assert_eq!(pool.queue_length(), pool.headers_num());
        port.destroy_pool(pool);
        component.destroy().expect("destroy");

        assert_eq!(journal.count(SimCall::SendBuffer), 3);
        assert!(journal.position(SimCall::PortDisable) < journal.position(SimCall::PoolDestroy));
        assert!(journal.position(SimCall::PoolDestroy) < journal.position(SimCall::ComponentDestroy));
    }

    #[test]
    fn test_free_running_fills_every_buffer() {
        let factory = SimFactory::new(quick().with_frames_to_emit(None));
        let mut component = factory.create(SOURCE_COMPONENT).expect("create");
        let port = configured_port(&mut component);
        let pool = port.create_pool(port.buffer_num(), port.buffer_size()).expect("pool");

        let (tx, rx) = sync_channel(8);
        port.enable(Box::new(move |buffer: FilledBuffer<'_>| {
            let _ = tx.try_send(buffer.index);
        }))
        .expect("enable");
        while let Some(header) = pool.get() {
            port.send_buffer(header).expect("send");
        }

        let mut seen: Vec<usize> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).expect("callback"))
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2]);
        port.disable().expect("disable");
    }

    #[test]
    fn test_disable_flushes_sent_buffers() {
        let factory = SimFactory::new(quick().with_frames_to_emit(None));
        let mut component = factory.create(SOURCE_COMPONENT).expect("create");
        let port = configured_port(&mut component);
        let pool = port.create_pool(port.buffer_num(), port.buffer_size()).expect("pool");

        let (tx, rx) = sync_channel(8);
        port.enable(Box::new(move |buffer: FilledBuffer<'_>| {
            let _ = tx.try_send(buffer.index);
        }))
        .expect("enable");
        while let Some(header) = pool.get() {
            port.send_buffer(header).expect("send");
        }
        port.disable().expect("disable");

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(pool.queue_length(), 3);
    }

    #[test]
    fn test_shutdown_is_journaled() {
        let mut factory = SimFactory::new(quick());
        let component = factory.create(SOURCE_COMPONENT).expect("create");
        component.destroy().expect("destroy");
        factory.shutdown().expect("shutdown");

        let journal = factory.journal();
        assert_eq!(journal.calls().last(), Some(&SimCall::Shutdown));
        assert_eq!(SimCall::Shutdown.api_name(), "mmal_vc_deinit");
    }

    #[test]
    fn test_fault_injection() {
        let factory = SimFactory::new(quick().with_fault(SimCall::FormatCommit, MmalStatus::NotReady));
        let journal = factory.journal();
        let mut component = factory.create(SOURCE_COMPONENT).expect("create");
        let port = component.output(0).expect("output 0");
        *port.format_mut() = VideoFormat::for_frame(Encoding::RGBA, 128, 128);

        let err = port.commit_format().expect_err("injected fault");
        assert_eq!(
            err,
            MmalError::Status {
                call: "mmal_port_format_commit",
                status: MmalStatus::NotReady
            }
        );
        assert_eq!(journal.calls(), vec![SimCall::ComponentCreate, SimCall::FormatCommit]);
    }

    #[test]
    fn test_pool_fault_is_null_result() {
        let factory = SimFactory::new(quick().with_fault(SimCall::PoolCreate, MmalStatus::NoMemory));
        let mut component = factory.create(SOURCE_COMPONENT).expect("create");
        let port = configured_port(&mut component);
        let err = port.create_pool(3, port.buffer_size()).expect_err("no pool");
        assert!(err.is_null_result());
    }
}
