//! Python FFI
use pyo3::prelude::*;

mod gen_macros;
pub mod network;

#[pymodule]
fn toponet(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<network::Network>()?;
    Ok(())
}
