//! Simulated Pattern Source Example
//!
//! Drives the simulated `vc.ril.source` through the full MMAL call order
//! and prints a summary of every buffer the driver thread fills.
//!
//! # Running
//!
//! ```bash
//! cargo run -p vc-mmal --example sim_source
//! ```

use std::sync::mpsc;
use std::time::Duration;

use vc_mmal::sim::{SimFactory, SimSourceConfig};
use vc_mmal::{
    BufferPool, ComponentFactory, Encoding, FilledBuffer, MediaComponent, OutputPort, PortParameter,
    SourcePattern, VideoFormat, SOURCE_COMPONENT,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("vc-mmal Simulated Source Example");
    println!("================================");

    // Free-running: every buffer sent gets filled
    let config = SimSourceConfig::default()
        .with_frames_to_emit(None)
        .with_buffer_num(4)
        .with_seed(2024);
    let mut factory = SimFactory::new(config);
    let journal = factory.journal();

    let mut component = factory.create(SOURCE_COMPONENT)?;
    println!("Component: {} ({} output)", component.name(), component.output_count());

    let port = component.output(0).ok_or("no output port")?;
    *port.format_mut() = VideoFormat::for_frame(Encoding::RGBA, 100, 60);
    port.commit_format()?;
    port.set_parameter(PortParameter::SourcePattern(SourcePattern::Colour))?;
    port.set_parameter(PortParameter::ZeroCopy(false))?;

    let format = *port.format();
    println!(
        "Committed: {} {}x{} (crop {}x{})",
        format.encoding, format.width, format.height, format.crop.width, format.crop.height
    );
    println!("Buffers: {} x {} bytes", port.buffer_num(), port.buffer_size());

    let pool = port.create_pool(port.buffer_num(), port.buffer_size())?;
    let (tx, rx) = mpsc::sync_channel(8);
    port.enable(Box::new(move |buffer: FilledBuffer<'_>| {
        let first = buffer.data.first().copied().unwrap_or_default();
        let _ = tx.try_send((buffer.index, buffer.length(), buffer.pts, first));
    }))?;

    let mut sent = 0;
    while let Some(header) = pool.get() {
        port.send_buffer(header)?;
        sent += 1;
    }
    println!("Sent {sent} buffers\n");

    for _ in 0..sent {
        let (index, length, pts, first) = rx.recv_timeout(Duration::from_secs(5))?;
        println!("  buffer {index}: {length} bytes, pts {pts:?}, first byte {first:#04x}");
    }

    port.disable()?;
    port.destroy_pool(pool);
    component.destroy()?;
    factory.shutdown()?;

    println!("\nCall journal:");
    for call in journal.calls() {
        println!("  {}", call.api_name());
    }

    Ok(())
}
