//! Error types for murmur.
//!
//! Only backend initialization can fail in a way that stops the simulation.
//! Everything else (parameter values, pointer coordinates) is accepted as-is.

use std::fmt;

/// Errors that can occur during GPU initialization or readback.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// The adapter cannot use the state texture format as a storage target.
    UnsupportedFormat(wgpu::TextureFormat),
    /// Failed to map buffer for reading.
    BufferMapping(String),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::UnsupportedFormat(format) => write!(
                f,
                "GPU adapter cannot write {:?} storage textures; full float precision is required for the state textures",
                format
            ),
            GpuError::BufferMapping(msg) => write!(f, "Failed to map GPU buffer: {}", msg),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

/// Errors raised while setting up or reading a compute backend.
#[derive(Debug)]
pub enum ComputeError {
    /// A variable lists a dependency that was never registered.
    UnknownDependency { variable: String, dependency: String },
    /// Two variables were registered under the same name.
    DuplicateVariable(String),
    /// A variable reads nothing, so it has no previous state to update from.
    NoDependencies(String),
    /// The grid width must be at least one texel.
    EmptyGrid,
    /// GPU backend failure.
    Gpu(GpuError),
}

impl fmt::Display for ComputeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeError::UnknownDependency { variable, dependency } => write!(
                f,
                "Variable '{}' depends on unregistered variable '{}'",
                variable, dependency
            ),
            ComputeError::DuplicateVariable(name) => write!(f, "Variable '{}' registered twice", name),
            ComputeError::NoDependencies(name) => write!(f, "Variable '{}' has no dependencies", name),
            ComputeError::EmptyGrid => write!(f, "Grid width must be greater than zero"),
            ComputeError::Gpu(e) => write!(f, "GPU error: {}", e),
        }
    }
}

impl std::error::Error for ComputeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ComputeError::Gpu(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GpuError> for ComputeError {
    fn from(e: GpuError) -> Self {
        ComputeError::Gpu(e)
    }
}

/// Errors that can occur while loading a configuration file.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read file from disk.
    Io(std::io::Error),
    /// File contents are not a valid configuration.
    Parse(serde_json::Error),
    /// Grid width whose bird mesh would not fit a `u32` vertex count.
    InvalidWidth(u32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
            ConfigError::InvalidWidth(w) => {
                write!(f, "Grid width {} is too large; {}x{} birds do not fit one draw call", w, w, w)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::InvalidWidth(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Errors that can occur when running a simulation.
#[derive(Debug)]
pub enum SimulationError {
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
    /// Compute backend could not be set up.
    Compute(ComputeError),
    /// Configuration could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            SimulationError::Window(e) => write!(f, "Failed to create window: {}", e),
            SimulationError::Compute(e) => write!(f, "Compute backend error: {}", e),
            SimulationError::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::EventLoop(e) => Some(e),
            SimulationError::Window(e) => Some(e),
            SimulationError::Compute(e) => Some(e),
            SimulationError::Config(e) => Some(e),
        }
    }
}

impl From<winit::error::EventLoopError> for SimulationError {
    fn from(e: winit::error::EventLoopError) -> Self {
        SimulationError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for SimulationError {
    fn from(e: winit::error::OsError) -> Self {
        SimulationError::Window(e)
    }
}

impl From<ComputeError> for SimulationError {
    fn from(e: ComputeError) -> Self {
        SimulationError::Compute(e)
    }
}

impl From<GpuError> for SimulationError {
    fn from(e: GpuError) -> Self {
        SimulationError::Compute(ComputeError::Gpu(e))
    }
}

impl From<ConfigError> for SimulationError {
    fn from(e: ConfigError) -> Self {
        SimulationError::Config(e)
    }
}
