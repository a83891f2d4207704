//! Bidirectional conversion state machine.
//!
//! Two buckets, `from` and `to`, each hold an amount and a currency. Exactly
//! one of them is *active* (last focused); the other is *inactive* and its
//! amount is derived from the active one through the current [`Converter`].
//!
//! [`Buckets::apply`] is the pure transition function over [`Action`]s.
//! [`BucketMachine`] adds the reactive part: after every transition and
//! every converter replacement it re-derives the inactive bucket, but only
//! when one of the values the derivation depends on actually changed.

use std::fmt::Display;

use crate::core::currency::{Currency, CurrencyPair};
use crate::core::rates::Converter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    From,
    To,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::From => Side::To,
            Side::To => Side::From,
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::From => f.write_str("from"),
            Side::To => f.write_str("to"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub amount: Option<f64>,
    pub currency: Currency,
    pub last_focused: bool,
}

impl Bucket {
    /// The amount, treating an explicit zero the same as an empty field.
    pub fn effective_amount(&self) -> Option<f64> {
        effective(self.amount)
    }
}

fn effective(amount: Option<f64>) -> Option<f64> {
    amount.filter(|value| *value != 0.0 && !value.is_nan())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    SetAmount { side: Side, amount: Option<f64> },
    SetCurrency { side: Side, currency: Currency },
    SetLastFocused(Side),
    Swap,
}

/// The pair of buckets. Fields are private so the single-active-bucket
/// invariant can only change through [`Action`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct Buckets {
    from: Bucket,
    to: Bucket,
}

impl Default for Buckets {
    fn default() -> Self {
        Self::new(Currency::Eur, Currency::Gbp)
    }
}

impl Buckets {
    /// Empty buckets with `from` focused.
    pub fn new(from: Currency, to: Currency) -> Self {
        Self {
            from: Bucket {
                amount: None,
                currency: from,
                last_focused: true,
            },
            to: Bucket {
                amount: None,
                currency: to,
                last_focused: false,
            },
        }
    }

    pub fn from(&self) -> &Bucket {
        &self.from
    }

    pub fn to(&self) -> &Bucket {
        &self.to
    }

    pub fn get(&self, side: Side) -> &Bucket {
        match side {
            Side::From => &self.from,
            Side::To => &self.to,
        }
    }

    fn get_mut(&mut self, side: Side) -> &mut Bucket {
        match side {
            Side::From => &mut self.from,
            Side::To => &mut self.to,
        }
    }

    pub fn active_side(&self) -> Side {
        if self.to.last_focused {
            Side::To
        } else {
            Side::From
        }
    }

    pub fn active(&self) -> &Bucket {
        self.get(self.active_side())
    }

    pub fn inactive(&self) -> &Bucket {
        self.get(self.active_side().other())
    }

    /// The direction money moves on submission.
    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(self.from.currency, self.to.currency)
    }

    /// Conversion direction out of `side` into the other bucket.
    pub fn pair_from(&self, side: Side) -> CurrencyPair {
        CurrencyPair::new(self.get(side).currency, self.get(side.other()).currency)
    }

    pub fn apply(&mut self, action: Action) {
        match action {
            Action::SetAmount { side, amount } => self.get_mut(side).amount = amount,
            Action::SetCurrency { side, currency } => self.get_mut(side).currency = currency,
            Action::SetLastFocused(side) => {
                self.get_mut(side).last_focused = true;
                self.get_mut(side.other()).last_focused = false;
            }
            Action::Swap => std::mem::swap(&mut self.from, &mut self.to),
        }
    }

    /// Overwrites the inactive amount with the converted active amount.
    /// Returns false when the active bucket has nothing to convert.
    pub fn derive_inactive(&mut self, converter: &Converter) -> bool {
        let active = self.active_side();
        let Some(amount) = self.get(active).effective_amount() else {
            return false;
        };
        let converted = converter.convert(amount, self.pair_from(active));
        self.get_mut(active.other()).amount = Some(converted);
        true
    }
}

// Everything the inactive amount is derived from, plus the derived value
// itself so that a stray write to the inactive bucket is corrected too.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Dependencies {
    active: Side,
    active_amount: Option<f64>,
    active_currency: Currency,
    inactive_currency: Currency,
    inactive_amount: Option<f64>,
    generation: u64,
}

impl Dependencies {
    fn of(buckets: &Buckets, generation: u64) -> Self {
        Self {
            active: buckets.active_side(),
            active_amount: buckets.active().amount,
            active_currency: buckets.active().currency,
            inactive_currency: buckets.inactive().currency,
            inactive_amount: buckets.inactive().amount,
            generation,
        }
    }
}

/// Buckets plus the live converter, kept consistent after every change.
#[derive(Debug, Clone, Default)]
pub struct BucketMachine {
    buckets: Buckets,
    converter: Option<Converter>,
    generation: u64,
    settled: Option<Dependencies>,
}

impl BucketMachine {
    pub fn new(from: Currency, to: Currency) -> Self {
        Self {
            buckets: Buckets::new(from, to),
            ..Self::default()
        }
    }

    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    pub fn converter(&self) -> Option<&Converter> {
        self.converter.as_ref()
    }

    pub fn dispatch(&mut self, action: Action) {
        self.buckets.apply(action);
        self.settle();
    }

    /// Applies a user edit of `side`'s amount and pre-converts the other
    /// side straight away, whichever bucket is currently active. Clearing
    /// the field (or typing 0) clears the other side as well.
    pub fn edit_amount(&mut self, side: Side, amount: Option<f64>) {
        self.buckets.apply(Action::SetAmount { side, amount });
        match effective(amount) {
            None => self.buckets.apply(Action::SetAmount {
                side: side.other(),
                amount: None,
            }),
            Some(value) => {
                if let Some(converter) = &self.converter {
                    let converted = converter.convert(value, self.buckets.pair_from(side));
                    self.buckets.apply(Action::SetAmount {
                        side: side.other(),
                        amount: Some(converted),
                    });
                }
            }
        }
        self.settle();
    }

    pub fn set_converter(&mut self, converter: Converter) {
        self.converter = Some(converter);
        self.generation += 1;
        self.settle();
    }

    /// Re-derives the inactive bucket if anything it depends on changed since
    /// the last settle. Returns whether a derivation ran.
    pub fn settle(&mut self) -> bool {
        let current = Dependencies::of(&self.buckets, self.generation);
        if self.settled == Some(current) {
            return false;
        }
        let derived = match &self.converter {
            Some(converter) => self.buckets.derive_inactive(converter),
            None => false,
        };
        self.settled = Some(Dependencies::of(&self.buckets, self.generation));
        derived
    }
}
