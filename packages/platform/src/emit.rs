use finance::{
    coin::Coin,
    currency::{Currency, SymbolStatic},
};

use crate::message::{Level, Message};

pub trait Emit
where
    Self: Sized,
{
    fn emit<K, V>(self, event_key: K, event_value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>;

    /// Specialization of [`emit`](Self::emit) for values implementing [`ToString`].
    fn emit_to_string_value<K, V>(self, event_key: K, value: V) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        self.emit(event_key, value.to_string())
    }

    /// Specialization of [`emit`](Self::emit) for [`Currency`]'s ticker.
    fn emit_currency_symbol<K>(self, event_key: K, currency_symbol: SymbolStatic) -> Self
    where
        K: Into<String>,
    {
        self.emit(event_key, currency_symbol)
    }

    /// Emit the coin in the display unit along with its ticker.
    fn emit_coin<K, C>(self, event_key: K, coin: Coin<C>) -> Self
    where
        K: Into<String>,
        C: Currency,
    {
        let key = event_key.into();
        let symbol_key = key.clone() + "-symbol";

        self.emit(key, coin.to_display())
            .emit_currency_symbol(symbol_key, C::TICKER)
    }

    /// Emit an optional value only if present.
    fn emit_if_some<K, V>(self, event_key: K, value: Option<V>) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        match value {
            Some(value) => self.emit_to_string_value(event_key, value),
            None => self,
        }
    }
}

pub struct Emitter {
    message: Message,
}

impl Emitter {
    pub fn of_type<T>(event_type: T) -> Self
    where
        T: Into<String>,
    {
        Self::new(Level::Info, event_type)
    }

    pub fn of_error<T>(event_type: T) -> Self
    where
        T: Into<String>,
    {
        Self::new(Level::Error, event_type)
    }

    fn new<T>(level: Level, event_type: T) -> Self
    where
        T: Into<String>,
    {
        Self {
            message: Message::new(level, event_type.into()),
        }
    }
}

impl From<Emitter> for Message {
    fn from(emitter: Emitter) -> Self {
        emitter.message
    }
}

impl Emit for Emitter {
    fn emit<K, V>(mut self, event_key: K, event_value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.message = self
            .message
            .add_attribute(event_key.into(), event_value.into());

        self
    }
}
