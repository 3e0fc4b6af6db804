use candle_core::Device;

use super::cache::ModelOptions;
use crate::error::{PipelineError, Result};

/// Where a pipeline should run its model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceRequest {
    /// Run on the CPU (default).
    #[default]
    Cpu,
    /// Run on the CUDA GPU with this ordinal.
    Cuda(usize),
}

impl DeviceRequest {
    /// Open the requested device.
    pub fn resolve(self) -> Result<Device> {
        match self {
            DeviceRequest::Cpu => Ok(Device::Cpu),
            DeviceRequest::Cuda(i) => Device::new_cuda(i).map_err(|e| {
                PipelineError::Device(format!(
                    "Failed to init CUDA device {i}: {e}. Try CPU as fallback."
                ))
            }),
        }
    }
}

macro_rules! impl_device_methods {
    ($builder:ident < $($gen:ident : $bound:path),* >) => {
        impl<$($gen: $bound),*> $builder<$($gen),*> {
            /// Use CPU for inference (default).
            pub fn cpu(mut self) -> Self {
                self.device_request = crate::pipelines::utils::DeviceRequest::Cpu;
                self
            }

            /// Use a specific CUDA GPU for inference.
            pub fn cuda(mut self, index: usize) -> Self {
                self.device_request = crate::pipelines::utils::DeviceRequest::Cuda(index);
                self
            }

            /// Use an already-chosen device request.
            pub fn device(mut self, request: crate::pipelines::utils::DeviceRequest) -> Self {
                self.device_request = request;
                self
            }
        }
    };
}

pub(crate) use impl_device_methods;

pub fn build_cache_key<O: ModelOptions>(options: &O, device: &Device) -> String {
    format!("{}-{:?}", options.cache_key(), device.location())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl ModelOptions for Named {
        fn cache_key(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn cache_key_includes_device() {
        let key = build_cache_key(&Named("qwen3-0.6b"), &Device::Cpu);
        assert!(key.starts_with("qwen3-0.6b-"));
        assert!(key.contains("Cpu"));
    }

    #[test]
    fn cpu_always_resolves() {
        assert!(matches!(DeviceRequest::Cpu.resolve(), Ok(Device::Cpu)));
        assert_eq!(DeviceRequest::default(), DeviceRequest::Cpu);
    }
}
