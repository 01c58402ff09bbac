#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod complex;
pub mod config;
pub mod fit;
pub mod inverse;
pub mod median;
pub mod ostree;
pub mod transpose;
pub mod types;

pub use complex::{ComplexPlanes, complex_multiply};
pub use config::{ConfigError, KernelConfig, MedianConfig, TransposeConfig};
pub use fit::{CurveFit, FitError, SurfaceFit, error_from_chisq_curve, error_from_chisq_surface};
pub use median::{sliding_median, sliding_median_into, sliding_median_with};
pub use ostree::{OrderStatTree, OrderStatistics};
pub use transpose::{
    TileShape, TransposeEngine, TransposeMode, plan_transpose, transpose, transpose_array,
    transpose_padded, transpose_padded_uniform, transpose_padded_with,
};
pub use types::{KernelError, Sample};
