// Hanko engine library
//
// Core of a creative-tools suite: deterministic watermark compositing,
// batch processing into a downloadable archive, a durable asset vault,
// and whole-vault backup/restore.

pub mod backup;
pub mod batch;
pub mod constants;
pub mod error;
pub mod logging;
pub mod vault;
pub mod watermark;
