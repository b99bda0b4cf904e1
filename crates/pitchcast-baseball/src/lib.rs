// Library root: pitch catalog, season feature pipeline, pitcher snapshots and
// inference-time feature assembly.

pub mod assembler;
pub mod encoding;
pub mod pipeline;
pub mod pitch;
pub mod rates;
pub mod record;
pub mod sequence;
pub mod snapshot;
pub mod table;
pub mod training;
