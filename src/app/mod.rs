pub mod ports;
pub mod add_use_case;
pub mod remove_use_case;
pub mod search_use_case;
pub mod docs_use_case;
pub mod sort_use_case;
