/// One of the 8 flip/transpose combinations.
///
/// Bit 0 mirrors columns, bit 1 mirrors rows, bit 2 transposes. Flips are
/// applied in source coordinates after the transpose lookup, so code 6 is a
/// clockwise quarter turn and code 5 a counter-clockwise one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Orientation(u8);

impl Orientation {
    pub const NORMAL: Orientation = Orientation(0);
    pub const FLIP_COLUMNS: Orientation = Orientation(1);
    pub const FLIP_ROWS: Orientation = Orientation(2);
    pub const ROTATE_180: Orientation = Orientation(3);
    pub const TRANSPOSE: Orientation = Orientation(4);
    pub const ROTATE_270: Orientation = Orientation(5);
    pub const ROTATE_90: Orientation = Orientation(6);
    pub const TRANSVERSE: Orientation = Orientation(7);

    pub fn from_code(code: u8) -> Option<Self> {
        (code < 8).then_some(Orientation(code))
    }

    /// Clockwise rotation in degrees; any multiple of 90, negative allowed.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Self::NORMAL),
            90 => Some(Self::ROTATE_90),
            180 => Some(Self::ROTATE_180),
            270 => Some(Self::ROTATE_270),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self.0
    }

    pub fn flips_columns(self) -> bool {
        self.0 & 1 != 0
    }

    pub fn flips_rows(self) -> bool {
        self.0 & 2 != 0
    }

    pub fn transposes(self) -> bool {
        self.0 & 4 != 0
    }

    pub fn is_identity(self) -> bool {
        self.0 == 0
    }
}
