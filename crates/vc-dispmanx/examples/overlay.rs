//! Simulated Overlay Example
//!
//! Shows a gradient on the simulated compositor with the default overlay
//! settings (layer 5, opacity 128) and prints what the screen looked like
//! while the element was up.
//!
//! # Running
//!
//! ```bash
//! cargo run -p vc-dispmanx --example overlay
//! ```

use std::time::Duration;

use vc_dispmanx::sim::{SimDisplayConfig, SimDispmanx};
use vc_dispmanx::{DisplaySurfaceManager, HostSession, ImageType, ImageView, SimHost, SurfaceConfig};

const SIZE: u32 = 128;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("vc-dispmanx Overlay Example");
    println!("===========================");

    let host = SimHost::new();
    let session = HostSession::start(host.clone());

    let api = SimDispmanx::new(SimDisplayConfig::default().with_screen(320, 240)).with_host(host.clone());
    let config = SurfaceConfig::builder().hold(Duration::from_millis(200)).build();
    println!("Layer {}, opacity {}, hold {:?}", config.layer, config.opacity, config.hold);

    let pitch = ImageType::Rgba32.pitch(SIZE);
    let mut pixels = vec![0u8; (pitch * SIZE) as usize];
    for (y, row) in pixels.chunks_exact_mut(pitch as usize).enumerate() {
        for (x, px) in row[..(SIZE * 4) as usize].chunks_exact_mut(4).enumerate() {
            px.copy_from_slice(&[(x * 2) as u8, (y * 2) as u8, 0x80, 0xff]);
        }
    }

    let surface = DisplaySurfaceManager::new(api.clone(), config);
    surface.show_image(&ImageView::new(&pixels, SIZE, SIZE, pitch)?)?;

    for shown in api.presentations() {
        println!(
            "display {}: {} element(s), pixel (64,64) = {:?}",
            shown.display,
            shown.elements,
            shown.pixel(64, 64)
        );
    }

    session.end();
    println!("init {} / deinit {}", host.init_count(), host.deinit_count());

    Ok(())
}
