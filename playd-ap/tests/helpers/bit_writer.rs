//! MSB-first bit packing for the fixture writers

#[derive(Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    acc: u64,
    bits: u32,
}

impl BitWriter {
    /// Append the low `width` bits of `value`
    pub fn put(&mut self, value: u64, width: u32) {
        for i in (0..width).rev() {
            self.acc = (self.acc << 1) | ((value >> i) & 1);
            self.bits += 1;
            if self.bits == 8 {
                self.bytes.push(self.acc as u8);
                self.acc = 0;
                self.bits = 0;
            }
        }
    }

    pub fn finish(self) -> Vec<u8> {
        assert_eq!(self.bits, 0, "bit field must end on a byte boundary");
        self.bytes
    }
}
