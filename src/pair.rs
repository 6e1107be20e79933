use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UlamError};

/// Ulam 数列の開始値 (a, b)。0 < a < b。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UlamPair {
    pub a: i64,
    pub b: i64,
}

impl UlamPair {
    pub fn new(a: i64, b: i64) -> Result<Self> {
        if a <= 0 || a >= b {
            return Err(UlamError::InvalidPair { a, b });
        }
        Ok(UlamPair { a, b })
    }
}

impl fmt::Display for UlamPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U({},{})", self.a, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_validation() {
        assert!(UlamPair::new(1, 2).is_ok());
        assert_eq!(UlamPair::new(3, 3), Err(UlamError::InvalidPair { a: 3, b: 3 }));
        assert!(UlamPair::new(4, 3).is_err());
        assert!(UlamPair::new(0, 3).is_err());
        assert!(UlamPair::new(-1, 3).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(UlamPair::new(2, 3).unwrap().to_string(), "U(2,3)");
    }
}
