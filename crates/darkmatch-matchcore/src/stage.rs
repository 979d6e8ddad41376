//! The comparison stages and their transition table.
//!
//! | # | Stage           | Difference reconstructed                 | Passes when      |
//! |---|-----------------|------------------------------------------|------------------|
//! | 1 | `PriceExp`      | buy.price.exp − sell.price.exp           | non-negative     |
//! | 2 | `PriceCo`       | buy.price.co − sell.price.co             | non-negative     |
//! | 3 | `BuyVolumeExp`  | buy.volume.exp − sell.min_volume.exp     | non-negative     |
//! | 4 | `BuyVolumeCo`   | buy.volume.co − sell.min_volume.co       | non-negative     |
//! | 5 | `SellVolumeExp` | sell.volume.exp − buy.min_volume.exp     | non-negative     |
//! | 6 | `SellVolumeCo`  | sell.volume.co − buy.min_volume.co       | non-negative     |
//! | 7 | `Tokens`        | buy.tokens − sell.tokens                 | exactly zero     |

use std::fmt;

use darkmatch_types::{DarkmatchError, OrderFragment, Result, Scalar, Share};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum Stage {
    PriceExp,
    PriceCo,
    BuyVolumeExp,
    BuyVolumeCo,
    SellVolumeExp,
    SellVolumeCo,
    Tokens,
}

impl Stage {
    pub const FIRST: Self = Self::PriceExp;

    pub const ALL: [Self; 7] = [
        Self::PriceExp,
        Self::PriceCo,
        Self::BuyVolumeExp,
        Self::BuyVolumeCo,
        Self::SellVolumeExp,
        Self::SellVolumeCo,
        Self::Tokens,
    ];

    /// Stage marker embedded in the join ID.
    #[must_use]
    pub fn marker(self) -> u8 {
        match self {
            Self::PriceExp => 1,
            Self::PriceCo => 2,
            Self::BuyVolumeExp => 3,
            Self::BuyVolumeCo => 4,
            Self::SellVolumeExp => 5,
            Self::SellVolumeCo => 6,
            Self::Tokens => 7,
        }
    }

    #[must_use]
    pub fn from_marker(marker: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.marker() == marker)
    }

    /// Stage issued after this one passes. `None` after `Tokens`.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::PriceExp => Some(Self::PriceCo),
            Self::PriceCo => Some(Self::BuyVolumeExp),
            Self::BuyVolumeExp => Some(Self::BuyVolumeCo),
            Self::BuyVolumeCo => Some(Self::SellVolumeExp),
            Self::SellVolumeExp => Some(Self::SellVolumeCo),
            Self::SellVolumeCo => Some(Self::Tokens),
            Self::Tokens => None,
        }
    }

    /// Whether the reconstructed difference lets the pair proceed.
    #[must_use]
    pub fn passes(self, value: Scalar) -> bool {
        match self {
            Self::Tokens => value.is_zero(),
            _ => value.is_non_negative(),
        }
    }

    /// This node's share of the stage's difference.
    pub fn difference(self, buy: &OrderFragment, sell: &OrderFragment) -> Result<Share> {
        let (lhs, rhs) = match self {
            Self::PriceExp => (&buy.price.exp, &sell.price.exp),
            Self::PriceCo => (&buy.price.co, &sell.price.co),
            Self::BuyVolumeExp => (&buy.volume.exp, &sell.minimum_volume.exp),
            Self::BuyVolumeCo => (&buy.volume.co, &sell.minimum_volume.co),
            Self::SellVolumeExp => (&sell.volume.exp, &buy.minimum_volume.exp),
            Self::SellVolumeCo => (&sell.volume.co, &buy.minimum_volume.co),
            Self::Tokens => (&buy.tokens, &sell.tokens),
        };
        lhs.checked_sub(rhs)
            .ok_or(DarkmatchError::ShareIndexMismatch {
                left: lhs.index,
                right: rhs.index,
            })
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PriceExp => write!(f, "PRICE_EXP"),
            Self::PriceCo => write!(f, "PRICE_CO"),
            Self::BuyVolumeExp => write!(f, "BUY_VOLUME_EXP"),
            Self::BuyVolumeCo => write!(f, "BUY_VOLUME_CO"),
            Self::SellVolumeExp => write!(f, "SELL_VOLUME_EXP"),
            Self::SellVolumeCo => write!(f, "SELL_VOLUME_CO"),
            Self::Tokens => write!(f, "TOKENS"),
        }
    }
}
