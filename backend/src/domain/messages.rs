//! Localized reply catalogue.
//!
//! Every user-facing string the bot sends lives here. Replies are chosen by
//! [`Locale`], which is derived from the chat's platform language code.
//! Administrative notifications are English only.

use super::{Order, OrderId, Style};

/// Supported reply languages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Locale {
    #[default]
    En,
    Ru,
}

impl Locale {
    /// Select a locale from a platform language code such as `ru` or `en-US`.
    ///
    /// # Examples
    /// ```
    /// use stylebot::domain::Locale;
    ///
    /// assert_eq!(Locale::from_language_code(Some("ru-RU")), Locale::Ru);
    /// assert_eq!(Locale::from_language_code(Some("de")), Locale::En);
    /// assert_eq!(Locale::from_language_code(None), Locale::En);
    /// ```
    pub fn from_language_code(code: Option<&str>) -> Self {
        match code {
            Some(code) if code.trim().to_ascii_lowercase().starts_with("ru") => Self::Ru,
            _ => Self::En,
        }
    }
}

const HELLO_EN: &str = "*🙋‍♂️ Hi there!*

I’m the #1 bot for transforming regular photos into beautiful cartoon styles.

*How to start?*
- Send a photo
- Choose a style (Ghibli, Disney, Pixar, Anime)
- Top up your balance
- Enjoy the result!";

const HELLO_RU: &str = "*🙋‍♂️ привет!*

Я №1 бот для трансформации обычных фотографий в красивые мультяшные стили

*Как начать?*
- Отправь фото
- Выбери стиль (гибли, дисней, пиксар, аниме)
- Пополни баланс
- Наслаждайся результатом";

/// Greeting sent for `/start` and `/help`. Markdown formatted.
pub fn hello(locale: Locale) -> &'static str {
    match locale {
        Locale::En => HELLO_EN,
        Locale::Ru => HELLO_RU,
    }
}

/// Generic retry prompt used when a collaborator failed.
pub fn try_later(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Something went wrong. Please try again later",
        Locale::Ru => "Что-то пошло не так. Попробуйте еще раз позже",
    }
}

/// Reply when an uploaded photo could not be fetched or stored.
pub fn photo_not_received(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Failed to receive photo. Please, try again later",
        Locale::Ru => "Не удалось получить фото. Попробуйте еще раз позже",
    }
}

/// Prompt accompanying the style keyboard.
pub fn choose_style(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Choose a style for photo transformation",
        Locale::Ru => "Выбери стиль для трансформации фото",
    }
}

pub fn order_not_found(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Order not found",
        Locale::Ru => "Заказ не найден",
    }
}

/// Reply for malformed callback data or payment payloads.
pub fn something_went_wrong(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Something went wrong. Please, try again later",
        Locale::Ru => "Что-то пошло не так. Пожалуйста, попробуйте позже",
    }
}

/// Markdown confirmation sent once payment has been accepted.
pub fn processing(locale: Locale, style: Style) -> String {
    match locale {
        Locale::En => format!(
            "✨ I'm now processing your photo in *{}* style. It may take a few minutes. ⏳ Please wait for the magic to happen... 🎨",
            style.label()
        ),
        Locale::Ru => format!(
            "✨ Обрабатываю твоё фото в стиле *{}*. Это может занять несколько минут. ⏳ Подожди немного, скоро будет магия... 🎨",
            style.label()
        ),
    }
}

/// Markdown caption attached to the delivered photo.
pub fn result_caption(locale: Locale, style: Style) -> String {
    match locale {
        Locale::En => format!(
            "Your photo has been transformed to *{}* style. Thank you for using our service! 🎉",
            style.label()
        ),
        Locale::Ru => format!(
            "Твоё фото преобразовано в стиль *{}*. Спасибо, что пользуешься нашим сервисом! 🎉",
            style.label()
        ),
    }
}

pub fn invoice_title(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "One-time payment",
        Locale::Ru => "Разовый платёж",
    }
}

pub fn invoice_description(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "One-time payment for the photo transformation",
        Locale::Ru => "Разовый платёж за трансформацию фото",
    }
}

/// Admin notice for a confirmed payment.
pub fn admin_order_paid(order: &Order) -> String {
    let style = order.style.map_or("unselected", Style::slug);
    format!(
        "Order {} from chat {} paid, style {style}",
        order.id, order.chat_id
    )
}

/// Admin notice for a payment that arrived after the order was settled.
pub fn admin_order_already_settled(order: &Order, charge_id: &str) -> String {
    format!(
        "Order {} from chat {} is already {}; extra payment {charge_id} needs a refund",
        order.id, order.chat_id, order.status
    )
}

/// Admin notice for an order the worker could not fulfil.
pub fn admin_order_failed(order_id: OrderId, detail: &str) -> String {
    format!("Order {order_id} failed: {detail}")
}
