//! Categorical answers offered by the estimator steps.
//!
//! Every choice carries the label shown to the user. The same label is used
//! on the wire (serde), in stored submissions and in analytics properties.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! labelled_choice {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vattr:meta])* $variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vattr])*
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// Every option, in the order it is offered.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            /// Case-insensitive lookup by display label.
            pub fn parse(s: &str) -> Option<Self> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|choice| choice.as_str().eq_ignore_ascii_case(s))
            }
        }

        impl fmt::Display for $name {
            fn fmt(
                &self,
                f: &mut fmt::Formatter<'_>,
            ) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

labelled_choice! {
    #[derive(Default)]
    PropertyType {
        Commercial => "Commercial",
        Residential => "Residential",
        #[default]
        NotSure => "Not sure",
    }
}

labelled_choice! {
    #[derive(Default)]
    ServiceType {
        NewInstallation => "New Installation",
        Replacement => "Replacement",
        Repair => "Repair",
        #[default]
        NotSure => "Not sure",
    }
}

labelled_choice! {
    /// Fence materials; a multi-select answer.
    MaterialType {
        Pvc => "PVC",
        Wood => "Wood",
        Aluminum => "Aluminum",
        ChainLink => "Chain Link",
        Other => "Other",
    }
}

labelled_choice! {
    /// Problems with the current shower or tub; a multi-select answer where
    /// [`ShowerIssue::None`] excludes every other option.
    ShowerIssue {
        LackOfSpace => "Lack of space",
        HardToEnterExit => "Hard to enter/exit",
        InaccessibleControls => "Inaccessible controls",
        HighThreshold => "High threshold",
        OtherNotSure => "Other/not sure",
        None => "None",
    }
}

labelled_choice! {
    #[derive(Default)]
    WaterHeaterType {
        StorageTank => "Storage tank water heater",
        Tankless => "Tankless water heater",
        Solar => "Solar water heater",
        #[default]
        NotSure => "Not sure",
    }
}

labelled_choice! {
    #[derive(Default)]
    PlumbingCondition {
        Good => "Good",
        Fair => "Fair",
        Poor => "Poor",
        #[default]
        NotSure => "Not sure",
    }
}

labelled_choice! {
    #[derive(Default)]
    ProjectType {
        TubToWalkInShower => "Tub to walk-in shower",
        ShowerToWalkInShower => "Shower to walk-in shower",
        #[default]
        NotSure => "Not sure",
    }
}
