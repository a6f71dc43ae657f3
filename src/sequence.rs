//! The capture-and-show sequence
//!
//! [`CaptureSequence::run`] walks the states below exactly once. Every
//! hardware call is checked and the first failure ends the run; there is no
//! transition back to an earlier state. A failed run still releases the
//! media service and tears the platform down, in that order.
//!
//! ```text
//! INIT        platform init, create the completion handshake
//!  │
//! CONFIGURED  create the source, commit format, set pattern and zero-copy
//!  │
//! ENABLED     create the pool, enable the port, send every pooled buffer
//!  │
//! WAITING     block until the callback has shown a frame and posted it
//!  │
//! DISABLED    disable the port, destroy the pool, destroy the component,
//!  │          release the media service
//! TERMINATED  destroy the handshake, platform deinit
//! ```
//!
//! The port callback runs on the driver's thread. It shows the first
//! completed frame on the overlay before posting, so the main thread cannot
//! start teardown while the frame is still on screen.

use std::fmt;
use std::time::Instant;

use tracing::{debug, error, info, warn};
use vc_dispmanx::{DisplaySurfaceManager, Dispmanx, Host, HostSession, ImageView};
use vc_mmal::{
    BufferCallback, BufferFlags, BufferHeader, BufferPool, ComponentFactory, FilledBuffer,
    MediaComponent, OutputPort, PortParameter, Rect, VideoFormat,
};

use crate::check;
use crate::config::DemoConfig;
use crate::error::{DemoError, Result};
use crate::handshake::{handshake, Completer, HandshakeError};

/// Where a run is, or where it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SequenceState {
    Init,
    Configured,
    Enabled,
    Waiting,
    Disabled,
    Terminated,
}

impl fmt::Display for SequenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::Configured => "CONFIGURED",
            Self::Enabled => "ENABLED",
            Self::Waiting => "WAITING",
            Self::Disabled => "DISABLED",
            Self::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}

/// Completed steps of a run, in the order they happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    HostInit,
    HandshakeCreate,
    ComponentCreate,
    FormatCommit,
    PatternSet,
    ZeroCopySet,
    PoolCreate,
    PortEnable,
    /// Buffer header with this pool index went to the port
    BufferSent(usize),
    FrameCompleted,
    PortDisable,
    PoolDestroy,
    ComponentDestroy,
    /// Media service released, `mmal_vc_deinit`
    FactoryShutdown,
    HandshakeDestroy,
    HostDeinit,
}

/// A step and when it finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRecord {
    pub step: Step,
    pub at: Instant,
}

/// The buffer that completed the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSummary {
    /// Pool index of the header
    pub index: usize,
    /// Bytes filled
    pub length: usize,
    /// Bytes allocated
    pub alloc_size: u32,
    pub flags: BufferFlags,
    /// Presentation timestamp in microseconds
    pub pts: Option<i64>,
}

impl FrameSummary {
    /// Whether the buffer held a whole, uncorrupted frame
    #[must_use]
    pub fn is_complete_frame(&self) -> bool {
        self.flags.is_complete_frame()
    }
}

impl From<&FilledBuffer<'_>> for FrameSummary {
    fn from(buffer: &FilledBuffer<'_>) -> Self {
        Self {
            index: buffer.index,
            length: buffer.length(),
            alloc_size: buffer.alloc_size,
            flags: buffer.flags,
            pts: buffer.pts,
        }
    }
}

/// What a successful run did
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Format as committed by the port
    pub format: VideoFormat,
    /// `buffer_num` reported after commit, and the pool size
    pub buffer_num: u32,
    /// `buffer_size` reported after commit
    pub buffer_size: u32,
    /// Buffers handed to the port
    pub buffers_sent: usize,
    /// The frame that was shown
    pub frame: FrameSummary,
    /// Completions after the first, which were neither shown nor posted
    pub ignored_completions: usize,
    pub steps: Vec<StepRecord>,
}

impl RunReport {
    /// Index of the first occurrence of `step`
    #[must_use]
    pub fn position(&self, step: Step) -> Option<usize> {
        self.steps.iter().position(|r| r.step == step)
    }

    /// When `step` finished
    #[must_use]
    pub fn finished_at(&self, step: Step) -> Option<Instant> {
        self.steps.iter().find(|r| r.step == step).map(|r| r.at)
    }
}

type Completion = Result<FrameSummary>;

/// One capture-and-show run against a host, an MMAL factory and DispmanX
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use vc_pattern::config::DemoConfig;
/// use vc_pattern::dispmanx::sim::SimDispmanx;
/// use vc_pattern::dispmanx::{SimHost, SurfaceConfig};
/// use vc_pattern::mmal::sim::SimFactory;
/// use vc_pattern::sequence::{CaptureSequence, SequenceState};
///
/// let config = DemoConfig::builder()
///     .surface(SurfaceConfig::builder().hold(Duration::ZERO).build())
///     .build();
/// let mut sequence = CaptureSequence::new(
///     SimHost::new(),
///     SimFactory::with_default(),
///     SimDispmanx::default(),
///     config,
/// );
///
/// let report = sequence.run().expect("run");
/// assert_eq!(sequence.state(), SequenceState::Terminated);
/// assert!(report.frame.length >= 128 * 128 * 4);
/// ```
#[derive(Debug)]
pub struct CaptureSequence<H, F, D> {
    host: H,
    factory: F,
    display: D,
    config: DemoConfig,
    state: SequenceState,
    started: bool,
    steps: Vec<StepRecord>,
}

impl<H, F, D> CaptureSequence<H, F, D>
where
    H: Host + Clone,
    F: ComponentFactory,
    D: Dispmanx + Clone + Send + 'static,
{
    pub fn new(host: H, factory: F, display: D, config: DemoConfig) -> Self {
        Self {
            host,
            factory,
            display,
            config,
            state: SequenceState::Init,
            started: false,
            steps: Vec::new(),
        }
    }

    /// Last state reached
    #[must_use]
    pub fn state(&self) -> SequenceState {
        self.state
    }

    /// Steps completed so far, including those of a failed run
    #[must_use]
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    #[must_use]
    pub fn config(&self) -> &DemoConfig {
        &self.config
    }

    /// Run the sequence to completion
    ///
    /// Can only be called once per sequence.
    pub fn run(&mut self) -> Result<RunReport> {
        if self.started {
            return Err(DemoError::AlreadyRun);
        }
        self.started = true;
        self.config.validate().map_err(DemoError::InvalidConfig)?;

        // INIT
        let session = HostSession::start(self.host.clone());
        self.record(Step::HostInit);

        let result = self.execute();
        if result.is_err() && !self.reached(Step::FactoryShutdown) {
            // Components are gone by now; release the service before the platform
            if let Err(e) = self.factory.shutdown() {
                warn!("Releasing the media service after a failed run also failed: {}", e);
            }
        }

        // TERMINATED
        session.end();
        self.record(Step::HostDeinit);

        match result {
            Ok(mut report) => {
                self.enter(SequenceState::Terminated);
                report.steps = self.steps.clone();
                Ok(report)
            }
            Err(e) => {
                error!("Run aborted in state {}: {}", self.state, e);
                Err(e)
            }
        }
    }

    fn reached(&self, step: Step) -> bool {
        self.steps.iter().any(|r| r.step == step)
    }

    fn record(&mut self, step: Step) {
        debug!("Step {:?}", step);
        self.steps.push(StepRecord {
            step,
            at: Instant::now(),
        });
    }

    fn enter(&mut self, state: SequenceState) {
        info!("{} -> {}", self.state, state);
        self.state = state;
    }

    fn execute(&mut self) -> Result<RunReport> {
        let (completer, waiter) = handshake::<Completion>();
        self.record(Step::HandshakeCreate);

        // CONFIGURED
        let mut component = check!(self.factory.create(&self.config.component))?;
        self.record(Step::ComponentCreate);

        let port = check!(component.output(self.config.output_port))?;
        *port.format_mut() = self.config.video_format();
        check!(port.commit_format())?;
        self.record(Step::FormatCommit);

        let format = *port.format();
        check!(port.set_parameter(PortParameter::SourcePattern(self.config.pattern)))?;
        self.record(Step::PatternSet);
        check!(port.set_parameter(PortParameter::ZeroCopy(self.config.zero_copy)))?;
        self.record(Step::ZeroCopySet);
        self.enter(SequenceState::Configured);

        // ENABLED
        let (buffer_num, buffer_size) = (port.buffer_num(), port.buffer_size());
        let pool = check!(port.create_pool(buffer_num, buffer_size))?;
        self.record(Step::PoolCreate);

        let surface = DisplaySurfaceManager::new(self.display.clone(), self.config.surface.clone());
        check!(port.enable(frame_callback(completer, surface, format)))?;
        self.record(Step::PortEnable);
        self.enter(SequenceState::Enabled);

        let queued = pool.queue_length();
        for _ in 0..queued {
            let header = check!(pool.get())?;
            let (index, length, flags) = (header.index(), header.length(), header.flags());
            check!(port.send_buffer(header))?;
            debug!("Sent header {} ({} bytes, flags {:#010x})", index, length, flags.bits());
            self.record(Step::BufferSent(index));
        }
        info!("Sent {} of {} buffers of {} bytes", queued, buffer_num, buffer_size);

        // WAITING
        self.enter(SequenceState::Waiting);
        let completion = match self.config.completion_timeout {
            Some(timeout) => waiter.wait_timeout(timeout),
            None => waiter.wait(),
        };
        let frame = match completion {
            Ok(shown) => shown?,
            Err(HandshakeError::TimedOut(timeout)) => return Err(DemoError::Timeout(timeout)),
            Err(e) => return Err(e.into()),
        };
        self.record(Step::FrameCompleted);
        info!(
            "Frame from buffer {} shown ({} bytes, flags {:#010x})",
            frame.index,
            frame.length,
            frame.flags.bits()
        );

        // DISABLED
        check!(port.disable())?;
        self.record(Step::PortDisable);
        port.destroy_pool(pool);
        self.record(Step::PoolDestroy);
        check!(component.destroy())?;
        self.record(Step::ComponentDestroy);
        check!(self.factory.shutdown())?;
        self.record(Step::FactoryShutdown);
        self.enter(SequenceState::Disabled);

        let ignored_completions = waiter.close();
        self.record(Step::HandshakeDestroy);
        if ignored_completions > 0 {
            warn!("{} completions after the first were ignored", ignored_completions);
        }

        Ok(RunReport {
            format,
            buffer_num,
            buffer_size,
            buffers_sent: queued,
            frame,
            ignored_completions,
            steps: Vec::new(),
        })
    }
}

/// Port callback: show the first completed frame, then post it
fn frame_callback<D>(
    completer: Completer<Completion>,
    surface: DisplaySurfaceManager<D>,
    format: VideoFormat,
) -> BufferCallback
where
    D: Dispmanx + Send + 'static,
{
    Box::new(move |buffer: FilledBuffer<'_>| {
        info!(
            "Buffer {} filled {} bytes, flags {:#010x}",
            buffer.index,
            buffer.length(),
            buffer.flags.bits()
        );

        if !completer.try_claim() {
            return;
        }

        let shown = show_frame(&surface, &format, &buffer).map(|()| FrameSummary::from(&buffer));
        if let Err(e) = &shown {
            error!("Showing buffer {} failed: {}", buffer.index, e);
        }
        if let Err(e) = completer.post(shown) {
            error!("Posting completion failed: {}", e);
        }
    })
}

fn show_frame<D: Dispmanx>(
    surface: &DisplaySurfaceManager<D>,
    format: &VideoFormat,
    buffer: &FilledBuffer<'_>,
) -> Result<()> {
    let pitch = check!(format.stride())?;
    let (width, height) = crop_size(format.crop)?;
    let image = check!(ImageView::new(buffer.data, width, height, pitch))?;
    check!(surface.show_image(&image))
}

/// Crop rectangle size in pixels
fn crop_size(crop: Rect) -> Result<(u32, u32)> {
    match (u32::try_from(crop.width), u32::try_from(crop.height)) {
        (Ok(width), Ok(height)) => Ok((width, height)),
        _ => Err(DemoError::InvalidConfig(vec![format!(
            "committed crop {crop:?} has a negative size"
        )])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vc_dispmanx::sim::SimDispmanx;
    use vc_dispmanx::{SimHost, SurfaceConfig};
    use vc_mmal::sim::{SimFactory, SimSourceConfig};

    fn quick_config() -> DemoConfig {
        DemoConfig::builder()
            .surface(SurfaceConfig::builder().hold(Duration::ZERO).build())
            .completion_timeout(Duration::from_secs(10))
            .build()
    }

    fn quick_source() -> SimSourceConfig {
        SimSourceConfig::default()
            .with_frame_interval(Duration::ZERO)
            .with_seed(7)
    }

    #[test]
    fn test_state_names() {
        assert_eq!(SequenceState::Init.to_string(), "INIT");
        assert_eq!(SequenceState::Terminated.to_string(), "TERMINATED");
        assert!(SequenceState::Waiting < SequenceState::Disabled);
    }

    #[test]
    fn test_crop_size_rejects_negative() {
        assert_eq!(crop_size(Rect::new(0, 0, 100, 50)).ok(), Some((100, 50)));
        assert!(matches!(
            crop_size(Rect::new(0, 0, -1, 50)),
            Err(DemoError::InvalidConfig(_))
        ));
        assert!(crop_size(Rect::new(0, 0, 8, i32::MIN)).is_err());
    }

    #[test]
    fn test_run_reaches_terminated() {
        let host = SimHost::new();
        let mut sequence = CaptureSequence::new(
            host.clone(),
            SimFactory::new(quick_source()),
            SimDispmanx::default().with_host(host.clone()),
            quick_config(),
        );

        let report = sequence.run().expect("run");
        assert_eq!(sequence.state(), SequenceState::Terminated);
        assert_eq!(report.buffers_sent, report.buffer_num as usize);
        assert_eq!(report.ignored_completions, 0);
        assert_eq!(host.init_count(), 1);
        assert_eq!(host.deinit_count(), 1);
    }

    #[test]
    fn test_run_twice_is_refused() {
        let mut sequence = CaptureSequence::new(
            SimHost::new(),
            SimFactory::new(quick_source()),
            SimDispmanx::default(),
            quick_config(),
        );
        sequence.run().expect("first run");
        assert!(matches!(sequence.run(), Err(DemoError::AlreadyRun)));
    }

    #[test]
    fn test_invalid_config_touches_nothing() {
        let host = SimHost::new();
        let mut sequence = CaptureSequence::new(
            host.clone(),
            SimFactory::new(quick_source()),
            SimDispmanx::default(),
            DemoConfig::builder().size(0, 0).build(),
        );

        assert!(matches!(sequence.run(), Err(DemoError::InvalidConfig(_))));
        assert_eq!(host.init_count(), 0);
        assert!(sequence.steps().is_empty());
    }

    #[test]
    fn test_missing_port_is_assertion() {
        let host = SimHost::new();
        let mut sequence = CaptureSequence::new(
            host.clone(),
            SimFactory::new(quick_source()),
            SimDispmanx::default(),
            DemoConfig::builder().output_port(3).build(),
        );

        let err = sequence.run().expect_err("no port 3");
        assert!(matches!(err, DemoError::Assertion { .. }));
        assert_eq!(sequence.state(), SequenceState::Init);
        // Platform teardown still happens when the run is abandoned
        assert_eq!(host.deinit_count(), 1);
    }
}
