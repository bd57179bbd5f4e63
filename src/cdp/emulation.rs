use serde::{Deserialize, Serialize};

use super::impl_command;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDeviceMetricsOverrideParams {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
    pub mobile: bool,
}

impl SetDeviceMetricsOverrideParams {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            device_scale_factor: 1.0,
            mobile: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SetDeviceMetricsOverrideReturns {}

impl_command!(
    SetDeviceMetricsOverrideParams,
    "Emulation.setDeviceMetricsOverride",
    SetDeviceMetricsOverrideReturns
);
