//! Inline-keyboard callback data of the form `<style>:<order_id>`.

use std::fmt;

use super::{OrderId, Style};

/// Reasons callback data could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StyleChoiceError {
    #[error("callback data is missing the ':' separator: {0}")]
    MissingSeparator(String),
    #[error("callback data names an unknown style: {0}")]
    UnknownStyle(String),
    #[error("callback data has a non-numeric order id: {0}")]
    InvalidOrderId(String),
}

/// A style picked for an order from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleChoice {
    pub style: Style,
    pub order_id: OrderId,
}

impl StyleChoice {
    pub fn new(style: Style, order_id: OrderId) -> Self {
        Self { style, order_id }
    }

    /// Decode callback data.
    ///
    /// # Examples
    /// ```
    /// use stylebot::domain::{OrderId, Style, StyleChoice};
    ///
    /// let choice = StyleChoice::parse("anime:12").unwrap();
    /// assert_eq!(choice, StyleChoice::new(Style::Anime, OrderId::new(12)));
    /// assert_eq!(choice.encode(), "anime:12");
    /// ```
    pub fn parse(data: &str) -> Result<Self, StyleChoiceError> {
        let (style, order_id) = data
            .split_once(':')
            .ok_or_else(|| StyleChoiceError::MissingSeparator(data.to_owned()))?;
        let style = style
            .parse::<Style>()
            .map_err(|_| StyleChoiceError::UnknownStyle(style.to_owned()))?;
        let order_id = order_id
            .parse::<OrderId>()
            .map_err(|_| StyleChoiceError::InvalidOrderId(order_id.to_owned()))?;
        Ok(Self { style, order_id })
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StyleChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.style.slug(), self.order_id)
    }
}
