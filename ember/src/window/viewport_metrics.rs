#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportMetrics {
    pub device_pixel_ratio: f64,
    pub physical_width: f64,
    pub physical_height: f64,
    pub physical_padding_top: f64,
    pub physical_padding_right: f64,
    pub physical_padding_bottom: f64,
    pub physical_padding_left: f64,
}

impl Default for ViewportMetrics {
    fn default() -> Self {
        Self {
            device_pixel_ratio: 1.0,
            physical_width: 0.0,
            physical_height: 0.0,
            physical_padding_top: 0.0,
            physical_padding_right: 0.0,
            physical_padding_bottom: 0.0,
            physical_padding_left: 0.0,
        }
    }
}

impl ViewportMetrics {
    pub fn with_size(width: f64, height: f64) -> Self {
        Self {
            physical_width: width,
            physical_height: height,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Locale {
    pub language_code: String,
    pub country_code: String,
}
