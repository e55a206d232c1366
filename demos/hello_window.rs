//! # Hello Window
//!
//! Opens a window, links a color shader and draws one triangle until the
//! window is closed or Escape is pressed.
//!
//! ```text
//! cargo run --example hello_window -- --width 1024 --height 768
//! RUST_LOG=debug cargo run --example hello_window -- --backend dummy --max-frames 60
//! ```

use clap::Parser;
use skr::resources::{ColorVertex, Mesh};
use skr::window::KeyCode;
use skr::{BackendType, ContextConfig, ShaderStage, ShaderStageSource, SkrResult, Window};

const VERTEX_SHADER: &str = r#"#version 330 core
layout (location = 0) in vec3 aPos;
layout (location = 1) in vec3 aColor;
out vec3 vColor;
void main() {
    vColor = aColor;
    gl_Position = vec4(aPos, 1.0);
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 330 core
in vec3 vColor;
out vec4 FragColor;
uniform float brightness;
void main() {
    FragColor = vec4(vColor * brightness, 1.0);
}
"#;

/// SKR hello window demo.
#[derive(Parser, Debug)]
#[command(name = "hello_window", about = "Draw a triangle with SKR")]
struct Args {
    /// Graphics backend (opengl, dummy)
    #[arg(long, default_value = "opengl")]
    backend: BackendType,

    /// Initial window width
    #[arg(long, default_value = "800")]
    width: u32,

    /// Initial window height
    #[arg(long, default_value = "600")]
    height: u32,

    /// Disable vertical sync
    #[arg(long)]
    no_vsync: bool,

    /// Exit after this many frames
    #[arg(long)]
    max_frames: Option<u64>,
}

fn main() {
    skr::init_logging();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        log::error!("hello_window failed: {e}");
        eprintln!("{}", skr::last_error::last_error());
        std::process::exit(1);
    }
}

fn run(args: &Args) -> SkrResult<()> {
    let config = ContextConfig::default()
        .with_title("Hello SKR")
        .with_size(args.width, args.height)
        .with_backend(args.backend)
        .with_vsync(!args.no_vsync)
        .with_clear_color([0.2, 0.3, 0.3, 1.0]);

    let mut window = Window::open(&config)?;
    window.set_input_handler(|window| {
        if window.is_key_pressed(KeyCode::Escape) {
            window.request_close();
        }
    });

    let ctx = window.context_mut();
    let mut program = ctx.compile_and_link(&[
        ShaderStageSource::inline(ShaderStage::Vertex, VERTEX_SHADER),
        ShaderStageSource::inline(ShaderStage::Fragment, FRAGMENT_SHADER),
    ])?;
    let mut triangle = ctx.upload(Mesh::<ColorVertex>::triangle())?;
    triangle.discard_cpu_data();
    triangle.bind_program(&program);

    let mut frame = 0u64;
    while !window.should_close() {
        let brightness = 0.75 + 0.25 * (frame as f32 * 0.05).sin();
        window.render_frame(|ctx| {
            ctx.use_program(&program);
            ctx.set_uniform(&program, "brightness", brightness);
            ctx.draw_mesh(&triangle)
        })?;

        frame += 1;
        if args.max_frames.is_some_and(|max| frame >= max) {
            window.request_close();
        }
    }
    log::info!("Rendered {frame} frames");

    let ctx = window.context_mut();
    ctx.release_mesh(&mut triangle);
    ctx.destroy_program(&mut program);
    Ok(())
}
