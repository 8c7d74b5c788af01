pub mod ecg;
pub mod filters;
pub mod ppg;
pub mod qrs;
pub mod rsp;

pub use ecg::{ecg_peaks, EcgConfig, EcgMethod};
pub use ppg::{ppg_peaks, ppg_peaks_with, PpgConfig};
pub use rsp::{rsp_peaks, RspConfig, RspKind};
