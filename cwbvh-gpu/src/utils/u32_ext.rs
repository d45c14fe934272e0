pub trait U32Ext
where
    Self: Sized,
{
    fn from_bytes(bytes: [u32; 4]) -> Self;
    fn to_bytes(self) -> [u32; 4];

    /// Returns the `idx`-th byte (counting from the least significant one).
    fn byte(self, idx: u32) -> u32;

    /// Returns index of the most significant set bit; undefined for zero.
    fn first_bit_high(self) -> u32;
}

impl U32Ext for u32 {
    fn from_bytes([a, b, c, d]: [u32; 4]) -> Self {
        a | (b << 8) | (c << 16) | (d << 24)
    }

    fn to_bytes(mut self) -> [u32; 4] {
        let a = self & 0xff;
        self >>= 8;
        let b = self & 0xff;
        self >>= 8;
        let c = self & 0xff;
        self >>= 8;
        let d = self & 0xff;

        [a, b, c, d]
    }

    fn byte(self, idx: u32) -> u32 {
        (self >> (idx * 8)) & 0xff
    }

    fn first_bit_high(self) -> u32 {
        31 - self.leading_zeros()
    }
}
