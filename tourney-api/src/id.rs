use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! id {
    ($name:ident, $id:ty) => {
        #[derive(
            Copy,
            Clone,
            Debug,
            Default,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
        )]
        #[repr(transparent)]
        #[serde(transparent)]
        pub struct $name(pub $id);

        impl Display for $name {
            #[inline]
            fn fmt(&self, f: &mut Formatter) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<$id> for $name {
            #[inline]
            fn from(id: $id) -> Self {
                Self(id)
            }
        }

        impl FromStr for $name {
            type Err = <$id as FromStr>::Err;

            #[inline]
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse::<$id>()?))
            }
        }
    };
}

id!(UserId, i64);
id!(TournamentId, i64);

#[cfg(test)]
mod tests {
    use super::{TournamentId, UserId};

    #[test]
    fn test_id_parse() {
        assert_eq!("42".parse::<UserId>().unwrap(), UserId(42));
        assert_eq!(" 7 ".parse::<TournamentId>().unwrap(), TournamentId(7));
        "abc".parse::<UserId>().unwrap_err();
        "".parse::<UserId>().unwrap_err();
    }

    #[test]
    fn test_id_serde_transparent() {
        assert_eq!(serde_json::to_string(&UserId(3)).unwrap(), "3");
        assert_eq!(
            serde_json::from_str::<TournamentId>("12").unwrap(),
            TournamentId(12)
        );
    }
}
