//! Full capture runs against the simulated source and compositor

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use vc_pattern::dispmanx::sim::{DispmanxCall, SimDispmanx};
use vc_pattern::dispmanx::{Host, SimHost, SurfaceConfig};
use vc_pattern::mmal::sim::{SimCall, SimFactory, SimJournal, SimSourceConfig};
use vc_pattern::mmal::{BufferFlags, MmalStatus, SourcePattern};
use vc_pattern::{CaptureSequence, DemoConfig, DemoError, RunReport, SequenceState, Step};

struct Rig {
    host: SimHost,
    factory: SimFactory,
    display: SimDispmanx,
}

impl Rig {
    fn new(source: SimSourceConfig) -> Self {
        let host = SimHost::new();
        Self {
            display: SimDispmanx::default().with_host(host.clone()),
            factory: SimFactory::new(source.with_frame_interval(Duration::ZERO).with_seed(42)),
            host,
        }
    }

    fn sequence(&self, config: DemoConfig) -> CaptureSequence<SimHost, SimFactory, SimDispmanx> {
        CaptureSequence::new(self.host.clone(), self.factory.clone(), self.display.clone(), config)
    }

    fn run(&self, config: DemoConfig) -> Result<RunReport, DemoError> {
        self.sequence(config).run()
    }
}

fn config() -> DemoConfig {
    DemoConfig::builder()
        .surface(SurfaceConfig::builder().hold(Duration::from_millis(5)).build())
        .completion_timeout(Duration::from_secs(10))
        .build()
}

#[test]
fn test_random_frame_is_shown() {
    let rig = Rig::new(SimSourceConfig::default());
    let report = rig.run(config()).expect("run");

    assert_eq!((report.format.width, report.format.height), (128, 128));
    assert!(report.frame.length >= 128 * 128 * 4);
    assert!(report.frame.is_complete_frame());
    assert!(report.frame.flags.contains(BufferFlags::FRAME));
    assert_eq!(report.ignored_completions, 0);

    // One element shown, then removed
    let shown = rig.display.presentations();
    assert_eq!(shown.len(), 2);
    assert_eq!(shown[0].elements, 1);
    assert_eq!(shown[1].elements, 0);
    assert_eq!(rig.display.open_displays(), 0);
    assert_eq!(rig.display.live_resources(), 0);

    assert_eq!(rig.host.init_count(), 1);
    assert_eq!(rig.host.deinit_count(), 1);
}

#[test]
fn test_pool_matches_port() {
    let rig = Rig::new(SimSourceConfig::default().with_buffer_num(4));
    let report = rig.run(config()).expect("run");

    assert_eq!(report.buffer_num, 4);
    assert_eq!(report.buffer_size, 128 * 128 * 4);
    assert_eq!(report.buffers_sent, 4);

    let sent: Vec<_> = report
        .steps
        .iter()
        .filter_map(|r| match r.step {
            Step::BufferSent(index) => Some(index),
            _ => None,
        })
        .collect();
    assert_eq!(sent.len(), 4);
    assert_eq!(rig.factory.journal().count(SimCall::SendBuffer), 4);
}

#[test]
fn test_format_rounds_up() {
    let rig = Rig::new(SimSourceConfig::default());
    let report = rig
        .run(DemoConfig {
            width: 100,
            height: 50,
            ..config()
        })
        .expect("run");

    assert_eq!((report.format.width, report.format.height), (128, 64));
    assert_eq!((report.format.crop.width, report.format.crop.height), (100, 50));
}

#[test]
fn test_teardown_order() {
    let rig = Rig::new(SimSourceConfig::default());
    let report = rig.run(config()).expect("run");

    let order = [
        Step::HostInit,
        Step::HandshakeCreate,
        Step::ComponentCreate,
        Step::FormatCommit,
        Step::PatternSet,
        Step::ZeroCopySet,
        Step::PoolCreate,
        Step::PortEnable,
        Step::FrameCompleted,
        Step::PortDisable,
        Step::PoolDestroy,
        Step::ComponentDestroy,
        Step::FactoryShutdown,
        Step::HandshakeDestroy,
        Step::HostDeinit,
    ];
    let positions: Vec<_> = order.iter().map(|s| report.position(*s).expect("step recorded")).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{:?}", report.steps);

    // The overlay is gone before teardown starts
    let closed = rig.display.journal().last_at(DispmanxCall::DisplayClose).expect("closed");
    let disabled = report.finished_at(Step::PortDisable).expect("disabled");
    assert!(closed <= disabled);

    let journal = rig.factory.journal();
    let disable = journal.position(SimCall::PortDisable).expect("disable");
    let pool = journal.position(SimCall::PoolDestroy).expect("pool destroy");
    let destroy = journal.position(SimCall::ComponentDestroy).expect("destroy");
    let shutdown = journal.position(SimCall::Shutdown).expect("shutdown");
    assert!(disable < pool && pool < destroy && destroy < shutdown);
}

#[test]
fn test_commit_failure_aborts_before_enable() {
    let rig = Rig::new(SimSourceConfig::default().with_fault(SimCall::FormatCommit, MmalStatus::Invalid));
    let mut sequence = rig.sequence(config());

    let err = sequence.run().expect_err("commit fails");
    assert!(matches!(err, DemoError::Mmal { .. }), "{err}");
    assert_eq!(err.code(), Some(3));
    assert!(err.to_string().contains("0x00000003"), "{err}");
    assert_eq!(sequence.state(), SequenceState::Init);

    let journal = rig.factory.journal();
    assert!(journal.contains(SimCall::FormatCommit));
    assert!(!journal.contains(SimCall::PortEnable));
    assert!(rig.display.presentations().is_empty());

    assert_eq!(rig.host.deinit_count(), 1);
    assert!(!rig.host.is_initialized());
}

#[test]
fn test_pool_failure_is_assertion() {
    let rig = Rig::new(SimSourceConfig::default().with_fault(SimCall::PoolCreate, MmalStatus::NoMemory));
    let mut sequence = rig.sequence(config());

    let err = sequence.run().expect_err("no pool");
    assert!(matches!(err, DemoError::Assertion { .. }), "{err}");
    assert!(err.to_string().contains("Assertion failed"), "{err}");
    assert_eq!(sequence.state(), SequenceState::Configured);
}

#[test]
fn test_display_failure_is_reported() {
    let host = SimHost::new();
    let display = SimDispmanx::new(
        vc_pattern::dispmanx::sim::SimDisplayConfig::default().with_fault(DispmanxCall::ResourceWriteData, -1),
    )
    .with_host(host.clone());
    let factory = SimFactory::new(SimSourceConfig::default().with_frame_interval(Duration::ZERO));

    let mut sequence = CaptureSequence::new(host.clone(), factory, display.clone(), config());
    let err = sequence.run().expect_err("write fails");

    assert!(matches!(err, DemoError::Dispmanx { .. }), "{err}");
    assert_eq!(err.code(), Some(0xffff_ffff));
    assert_eq!(display.open_displays(), 0);
    assert_eq!(host.deinit_count(), 1);
}

#[test]
fn test_later_completions_are_ignored() {
    // Every sent buffer completes; the port flushes them all before disable returns
    let rig = Rig::new(SimSourceConfig::default().with_frames_to_emit(None).with_buffer_num(4));
    let report = rig.run(config()).expect("run");

    assert_eq!(report.buffers_sent, 4);
    assert_eq!(report.ignored_completions, 3);
    assert_eq!(report.frame.index, 0);

    // Only the claimed completion reached the display
    let journal = rig.display.journal();
    assert_eq!(journal.count(DispmanxCall::DisplayOpen), 1);
    assert_eq!(journal.count(DispmanxCall::ElementAdd), 1);
    assert_eq!(journal.count(DispmanxCall::DisplayClose), 1);
    assert_eq!(rig.display.presentations().len(), 2);
}

#[test]
fn test_timeout_without_completion() {
    let rig = Rig::new(SimSourceConfig::default().with_frames_to_emit(Some(0)));
    let timeout = Duration::from_millis(50);
    let mut sequence = rig.sequence(DemoConfig {
        completion_timeout: Some(timeout),
        ..config()
    });

    let err = sequence.run().expect_err("nothing completes");
    assert!(matches!(err, DemoError::Timeout(t) if t == timeout), "{err}");
    assert_eq!(sequence.state(), SequenceState::Waiting);
    assert!(rig.display.presentations().is_empty());
    assert_eq!(rig.host.deinit_count(), 1);
}

#[test]
fn test_pattern_and_zero_copy_are_set() {
    let rig = Rig::new(SimSourceConfig::default());
    let report = rig
        .run(DemoConfig {
            pattern: SourcePattern::Colour,
            zero_copy: true,
            ..config()
        })
        .expect("run");

    assert_eq!(rig.factory.journal().count(SimCall::ParameterSet), 2);
    assert!(report.frame.is_complete_frame());
}

/// Host that notes whether the media service was released before deinit
#[derive(Clone)]
struct OrderedHost {
    inner: SimHost,
    journal: SimJournal,
    released_first: Arc<AtomicBool>,
}

impl Host for OrderedHost {
    fn init(&self) {
        self.inner.init();
    }

    fn deinit(&self) {
        self.released_first
            .store(self.journal.contains(SimCall::Shutdown), Ordering::SeqCst);
        self.inner.deinit();
    }
}

fn ordered_run(source: SimSourceConfig) -> (Result<RunReport, DemoError>, SimJournal, bool) {
    let inner = SimHost::new();
    let factory = SimFactory::new(source.with_frame_interval(Duration::ZERO));
    let journal = factory.journal();
    let host = OrderedHost {
        inner: inner.clone(),
        journal: journal.clone(),
        released_first: Arc::new(AtomicBool::new(false)),
    };
    let display = SimDispmanx::default().with_host(inner);

    let result = CaptureSequence::new(host.clone(), factory, display, config()).run();
    (result, journal, host.released_first.load(Ordering::SeqCst))
}

#[test]
fn test_service_released_before_platform_teardown() {
    let (result, journal, released_first) = ordered_run(SimSourceConfig::default());
    let report = result.expect("run");

    assert!(released_first);
    assert_eq!(journal.count(SimCall::Shutdown), 1);
    assert!(report.position(Step::FactoryShutdown) < report.position(Step::HostDeinit));
}

#[test]
fn test_failed_run_releases_service_before_platform_teardown() {
    let (result, journal, released_first) =
        ordered_run(SimSourceConfig::default().with_fault(SimCall::FormatCommit, MmalStatus::Invalid));

    assert!(result.is_err());
    assert!(released_first);
    assert_eq!(journal.count(SimCall::Shutdown), 1);
    assert_eq!(journal.calls().last(), Some(&SimCall::Shutdown));
}
