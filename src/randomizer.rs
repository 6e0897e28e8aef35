//! The controller scrambles page data with a 15-bit LFSR seeded per page. The engine undoes it
//! for data and parity, but the bad block marker inside the user bytes has to be derandomized
//! in software.

use crate::geometry::ERASE_BLOCK_PAGES;

/// Seeds used for page data, indexed by page within the eraseblock.
pub const GENERAL_SEEDS: [u16; 128] = [
    0x2b75, 0x0bd0, 0x5ca3, 0x62d1, 0x1c93, 0x07e9, 0x2162, 0x3a72,
    0x0d67, 0x67f9, 0x1be7, 0x077d, 0x032f, 0x0dac, 0x2716, 0x2436,
    0x7922, 0x1510, 0x3860, 0x5287, 0x480f, 0x4252, 0x1789, 0x5a2d,
    0x2a49, 0x5e10, 0x437f, 0x4b4e, 0x2f45, 0x216e, 0x5cb7, 0x7130,
    0x2a3f, 0x60e4, 0x4dc9, 0x0ef0, 0x0f52, 0x1bb9, 0x6211, 0x7a56,
    0x226d, 0x4ea7, 0x6f36, 0x3692, 0x38bf, 0x0c62, 0x05eb, 0x4c55,
    0x60f4, 0x728c, 0x3b6f, 0x2037, 0x7f69, 0x0936, 0x651a, 0x4ceb,
    0x6218, 0x79f3, 0x383f, 0x18d9, 0x4f05, 0x5c82, 0x2912, 0x6f17,
    0x6856, 0x5938, 0x1007, 0x61ab, 0x3e7f, 0x57c2, 0x542f, 0x4f62,
    0x7454, 0x2eac, 0x7739, 0x42d4, 0x2f90, 0x435a, 0x2e52, 0x2064,
    0x637c, 0x66ad, 0x2c90, 0x0bad, 0x759c, 0x0029, 0x0986, 0x7126,
    0x1ca7, 0x1605, 0x386a, 0x27f5, 0x1380, 0x6d75, 0x24c3, 0x0f8e,
    0x2b7a, 0x1418, 0x1fd1, 0x7dc1, 0x2d8e, 0x43af, 0x2267, 0x7da3,
    0x4e3d, 0x1338, 0x50db, 0x454d, 0x764d, 0x40a3, 0x42e6, 0x262b,
    0x2d2e, 0x1aea, 0x2e17, 0x173d, 0x3a6e, 0x71bf, 0x25f9, 0x0a5d,
    0x7c57, 0x0fbe, 0x46ce, 0x4939, 0x6b17, 0x37bb, 0x3e91, 0x76db,
];

/// Seeds used for the bad block marker of devices with 1k ECC sectors.
pub const ECC1024_SEEDS: [u16; 128] = [
    0x2cf5, 0x35f1, 0x63a4, 0x5274, 0x2bd2, 0x778b, 0x7285, 0x32b6,
    0x6a5c, 0x70d6, 0x757d, 0x6769, 0x5375, 0x1e81, 0x0cf3, 0x3982,
    0x6787, 0x042a, 0x6c49, 0x1925, 0x56a8, 0x40a9, 0x063e, 0x7bd9,
    0x4dbf, 0x55ec, 0x672e, 0x7334, 0x5185, 0x4d00, 0x232a, 0x7e07,
    0x445d, 0x6b92, 0x528f, 0x4255, 0x53ba, 0x7d82, 0x2a2e, 0x3a4e,
    0x75eb, 0x450c, 0x6844, 0x1b5d, 0x581a, 0x4cc6, 0x0379, 0x37b2,
    0x419f, 0x0e92, 0x6b27, 0x5624, 0x01e3, 0x07c1, 0x44a5, 0x130c,
    0x13e8, 0x5910, 0x0876, 0x60c5, 0x54e3, 0x5b7f, 0x2269, 0x509f,
    0x7665, 0x36fd, 0x3e9a, 0x0579, 0x6295, 0x14ef, 0x0a81, 0x1bcc,
    0x4b16, 0x64db, 0x0514, 0x4f07, 0x0591, 0x3576, 0x6853, 0x0d9e,
    0x259f, 0x38b7, 0x64fb, 0x3094, 0x4693, 0x6ddd, 0x29bb, 0x0bc8,
    0x3f47, 0x490e, 0x0c0e, 0x7933, 0x3c9e, 0x5840, 0x398d, 0x3e68,
    0x4af1, 0x71f5, 0x57cf, 0x1121, 0x64eb, 0x3579, 0x15ac, 0x584d,
    0x5f2a, 0x47e2, 0x6528, 0x6eac, 0x196e, 0x6b96, 0x0450, 0x0179,
    0x609c, 0x06e1, 0x4626, 0x42c7, 0x273e, 0x486f, 0x0705, 0x1601,
    0x145b, 0x407e, 0x062b, 0x57a5, 0x53f9, 0x5659, 0x4410, 0x3ccd,
];

/// Seed of `page` with the build-time eraseblock period.
pub fn seed_for_page(page: u32, use_ecc_table: bool) -> u16 {
    let table = if use_ecc_table {
        &ECC1024_SEEDS
    } else {
        &GENERAL_SEEDS
    };
    let period = ERASE_BLOCK_PAGES.min(table.len() as u32);

    table[(page % period) as usize]
}

/// Seed programmed into the ECC engine for `page` under the period hypothesis `nseeds`.
pub fn seed_for_period(page: u32, nseeds: u32) -> u16 {
    let period = nseeds.clamp(1, GENERAL_SEEDS.len() as u32);
    GENERAL_SEEDS[(page % period) as usize]
}

/// Advance the LFSR state `count` times.
///
/// Fibonacci LFSR with the x^16 + x^15 + 1 polynomial, 15 bits of state.
pub const fn step(state: u16, count: u32) -> u16 {
    let mut state = state & 0x7fff;
    let mut i = 0;
    while i < count {
        state = ((state >> 1) | (((state ^ (state >> 1)) & 1) << 14)) & 0x7fff;
        i += 1;
    }
    state
}

/// XOR the two bad block marker bytes with the randomizer stream of `page`. Applying it twice
/// restores the input.
pub fn derandomize_bad_block_marker(page: u32, marker: &mut [u8; 2]) {
    let seed = seed_for_page(page, true);

    marker[0] ^= seed as u8;
    marker[1] ^= step(seed, 8) as u8;
}
