use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::ActiveEventLoop,
    window::{Window, WindowId},
};

use crate::driver::FrameDriver;
use crate::error::SimulationError;
use crate::geometry::build_mesh;
use crate::gpu::{self, BirdRenderer, GpuCompute, GpuContext};
use crate::input::Input;
use crate::params::FlockConfig;
use crate::session::FlockSession;
use crate::state::StateStore;
use crate::time::Time;

pub(crate) const WINDOW_TITLE: &str = "murmur";
pub(crate) const WINDOW_SIZE: (u32, u32) = (1280, 720);

/// Everything that exists once the GPU is up.
struct Running {
    session: FlockSession<GpuCompute>,
    renderer: BirdRenderer,
    driver: FrameDriver,
}

pub(crate) struct App {
    config: FlockConfig,
    window: Option<Arc<Window>>,
    running: Option<Running>,
    input: Input,
    time: Time,
    error: Option<SimulationError>,
}

impl App {
    pub(crate) fn new(config: FlockConfig) -> Self {
        Self {
            config,
            window: None,
            running: None,
            input: Input::new(),
            time: Time::new(),
            error: None,
        }
    }

    /// The error that stopped the app, if any.
    pub(crate) fn into_result(self) -> Result<(), SimulationError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn start(&self, window: Arc<Window>) -> Result<Running, SimulationError> {
        self.config.validate()?;
        let size = window.inner_size();
        let instance = gpu::new_instance();
        let surface = instance.create_surface(window).map_err(gpu_error)?;
        let context = pollster::block_on(GpuContext::new(instance, Some(&surface)))?;

        let store = StateStore::initialize(self.config.width, self.config.bounds, self.config.seed);
        let compute = GpuCompute::new(&context, &store)?;

        let mesh = build_mesh(self.config.width);
        let surface_config = context.surface_config(&surface, size.width, size.height);
        let renderer = BirdRenderer::new(surface, surface_config, &compute, &mesh);

        let (width, height) = renderer.size();
        let session = FlockSession::new(compute, self.config.params, self.config.bounds);
        let driver = FrameDriver::new(self.time.now(), width, height);

        Ok(Running {
            session,
            renderer,
            driver,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: SimulationError) {
        log::error!("{}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let Some(running) = &mut self.running else {
            return;
        };

        if self.input.exit_requested() {
            event_loop.exit();
            return;
        }
        if self.input.pause_toggled() {
            self.time.toggle_pause();
            log::info!("{}", if self.time.is_paused() { "paused" } else { "resumed" });
        }
        if self.input.nudge_params(running.session.params_mut()) {
            let p = running.session.params();
            log::info!(
                "separation {:.0}, alignment {:.0}, cohesion {:.0}, freedom {:.2}",
                p.separation,
                p.alignment,
                p.cohesion,
                p.freedom
            );
        }
        if let Some(offset) = self.input.pointer_offset() {
            running.driver.submit_steering(offset);
        }

        let now = self.time.tick();
        running
            .driver
            .render_frame(now, &mut running.session, &mut running.renderer);

        match running.renderer.take_error() {
            None => {}
            Some(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost, reconfiguring");
                running.renderer.reconfigure();
            }
            Some(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("out of GPU memory");
                event_loop.exit();
            }
            Some(e) => log::warn!("render error: {:?}", e),
        }

        if running.driver.frames() % 600 == 0 {
            log::debug!("frame {} at {:.1} fps", running.driver.frames(), self.time.fps());
        }
        self.input.begin_frame();
    }
}

fn gpu_error(e: wgpu::CreateSurfaceError) -> SimulationError {
    SimulationError::from(crate::error::GpuError::from(e))
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(winit::dpi::PhysicalSize::new(WINDOW_SIZE.0, WINDOW_SIZE.1));
        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };
        self.window = Some(window.clone());

        let size = window.inner_size();
        self.input.set_window_size(size.width, size.height);

        match self.start(window.clone()) {
            Ok(running) => {
                self.running = Some(running);
                window.request_redraw();
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.input.handle_event(&event);
                if let Some(running) = &mut self.running {
                    running.renderer.resize(size.width, size.height);
                    running.driver.set_viewport(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                self.frame(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => self.input.handle_event(&event),
        }
    }
}
