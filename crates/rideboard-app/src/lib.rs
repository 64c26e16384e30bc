// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod badge;
pub mod detail;
pub mod filter;
pub mod format;
pub mod forms;
pub mod ids;
pub mod model;
pub mod snapshot;
pub mod state;

pub use badge::*;
pub use detail::*;
pub use filter::*;
pub use format::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use snapshot::*;
pub use state::*;
