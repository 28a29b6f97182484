/*!
 * Monitoring
 * Structured logging bootstrap
 */

pub mod tracer;

pub use tracer::init_tracing;
