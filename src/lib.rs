pub mod info;
pub mod packing;
pub mod segment;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed on IO.")]
    IO(#[from] std::io::Error),

    #[error("Could not parse the data as WASM module. {0}")]
    WasmParse(String),

    #[cfg(feature = "serde")]
    #[error("Failed to serialize report. {0}")]
    Json(#[from] serde_json::Error),
}
