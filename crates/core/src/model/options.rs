//! Fixed option sets offered by the session entry form.
//!
//! Every option has a stable slug (the persisted and wire value) and a
//! human-readable label.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raised when a slug does not name any option of the requested set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseOptionError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! slug_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => $slug:literal, $label:literal;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $slug)]
                $variant,
            )+
        }

        impl $name {
            /// Every option, in form order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $slug,)+
                }
            }

            #[must_use]
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseOptionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|option| option.as_str() == s)
                    .ok_or_else(|| ParseOptionError {
                        kind: stringify!($name),
                        value: s.to_owned(),
                    })
            }
        }
    };
}

slug_enum! {
    /// Regional cricket association a session was delivered under.
    Association {
        Auckland => "auckland", "Auckland";
        Wellington => "wellington", "Wellington";
        Canterbury => "canterbury", "Canterbury";
        Otago => "otago", "Otago";
        NorthernDistricts => "northern-districts", "Northern Districts";
        CentralDistricts => "central-districts", "Central Districts";
    }
}

slug_enum! {
    /// Timetable slot the session occupied.
    ClassPeriod {
        Period1 => "period-1", "Period 1";
        Period2 => "period-2", "Period 2";
        Period3 => "period-3", "Period 3";
        Period4 => "period-4", "Period 4";
        Period5 => "period-5", "Period 5";
        Lunch => "lunch", "Lunch Break";
        AfterSchool => "after-school", "After School";
    }
}

slug_enum! {
    YearGroup {
        Year1 => "Year 1", "Year 1";
        Year2 => "Year 2", "Year 2";
        Year3 => "Year 3", "Year 3";
        Year4 => "Year 4", "Year 4";
        Year5 => "Year 5", "Year 5";
        Year6 => "Year 6", "Year 6";
        Year7 => "Year 7", "Year 7";
        Year8 => "Year 8", "Year 8";
    }
}

slug_enum! {
    /// Session duration, persisted as the number of minutes.
    SessionLength {
        Min15 => "15", "15 minutes";
        Min20 => "20", "20 minutes";
        Min25 => "25", "25 minutes";
        Min30 => "30", "30 minutes";
        Min35 => "35", "35 minutes";
        Min40 => "40", "40 minutes";
        Min45 => "45", "45 minutes";
        Min50 => "50", "50 minutes";
        Min60 => "60", "60 minutes";
    }
}

slug_enum! {
    /// How involved the class teacher was during the session.
    TeacherEngagement {
        High => "high", "High";
        Moderate => "moderate", "Moderate";
        None => "none", "None";
    }
}

slug_enum! {
    /// Programme the session was run under.
    SessionType {
        YeahGirls => "yeah-girls", "Yeah Girls";
        SmashPlay => "smash-play", "Smash Play";
        GirlsSmash => "girls-smash", "Girls Smash";
        Other => "other", "Other";
    }
}

impl SessionLength {
    #[must_use]
    pub fn minutes(self) -> u32 {
        match self {
            SessionLength::Min15 => 15,
            SessionLength::Min20 => 20,
            SessionLength::Min25 => 25,
            SessionLength::Min30 => 30,
            SessionLength::Min35 => 35,
            SessionLength::Min40 => 40,
            SessionLength::Min45 => 45,
            SessionLength::Min50 => 50,
            SessionLength::Min60 => 60,
        }
    }
}

impl TeacherEngagement {
    /// Higher means more involved; `None` ranks lowest.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            TeacherEngagement::High => 2,
            TeacherEngagement::Moderate => 1,
            TeacherEngagement::None => 0,
        }
    }
}
