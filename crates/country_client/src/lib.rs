//! Country lookups and the cascading selection built on top of them.

pub mod gateway;
pub mod selection;

pub use gateway::{
    CountryGateway, GatewayError, GatewayOptions, RestCountriesGateway, DEFAULT_BASE_URL,
};
pub use selection::{
    CascadeError, CascadeOutcome, CascadeStep, SelectionController, SelectionError,
    SelectionEvent, SelectionSnapshot,
};
