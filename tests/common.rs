#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use std::collections::BTreeMap;

use sunxi_nand_spl::Geometry;
use sunxi_nand_spl::geometry::{ECC_BYTES, USER_DATA_BYTES};
use sunxi_nand_spl::platform::{Delay, Registers};
use sunxi_nand_spl::randomizer;
use sunxi_nand_spl::regs::{self, Cmd, Ctl, EccCtl, EccStatus, Status, opcode};

pub const NAND_ID: [u8; 6] = [0x2c, 0xdc, 0x90, 0xa6, 0x54, 0x00];

/// Device status: ready, not write protected
pub const NAND_STATUS: u8 = 0xe0;

/// Second user byte of every programmed sector, the first two are the bad block marker
pub const USER_TAG: u8 = 0x42;

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Reset,
    ReadId,
    ReadStatus,
    LoadPage { page: u32, cycles: u32 },
    ChangeColumn { column: u32 },
    EccRead { page: u32, column: u32, ecc_ctl: u32 },
    RawRead { column: u32, len: usize },
}

pub struct Page {
    pub data: Vec<u8>,
    /// user bytes per ECC sector as stored on the device, marker still randomized
    pub user: Vec<[u8; USER_DATA_BYTES]>,
    pub uncorrectable: bool,
    pub bitflips: u8,
    /// sectors from this one on were never programmed
    pub erased_from: Option<u32>,
}

/// NAND flash controller with a single chip attached. Only pages that were programmed hold
/// data, everything else reads as erased.
///
/// The ECC engine succeeds only if the controller is set up exactly like `geometry`, the way
/// the data was written. With a randomized geometry, `geometry.nseeds()` is the real period.
pub struct Flash {
    pub geometry: Geometry,
    pub pages: BTreeMap<u32, Page>,
    pub operations: Vec<Operation>,
    pub elapsed_us: u64,
    pub commands: usize,
    /// commands are accepted but never complete
    pub hang: bool,
    pub fifo_stuck: bool,
    pub reset_stuck: bool,
    pub released: bool,
    regs: BTreeMap<u32, u32>,
    sram: [u8; regs::SRAM_SIZE],
    loaded: Option<(u32, u32)>,
    column: u32,
}

impl Flash {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            pages: BTreeMap::new(),
            operations: Vec::new(),
            elapsed_us: 0,
            commands: 0,
            hang: false,
            fifo_stuck: false,
            reset_stuck: false,
            released: false,
            regs: BTreeMap::new(),
            sram: [0u8; regs::SRAM_SIZE],
            loaded: None,
            column: 0,
        }
    }

    /// Program `page` with `pattern(page, ..)` and good block markers.
    pub fn program(&mut self, page: u32) {
        let data = pattern(page, self.geometry.page_size().bytes() as usize);
        self.program_data(page, data);
    }

    pub fn program_range(&mut self, pages: core::ops::Range<u32>) {
        for page in pages {
            self.program(page);
        }
    }

    pub fn program_data(&mut self, page: u32, data: Vec<u8>) {
        assert_eq!(data.len(), self.geometry.page_size().bytes() as usize);

        let mut user: Vec<[u8; USER_DATA_BYTES]> = (0..self.geometry.nsectors())
            .map(|sector| [0xff, 0xff, sector as u8, USER_TAG])
            .collect();
        if self.geometry.randomize() {
            let mut marker = [user[0][0], user[0][1]];
            randomizer::derandomize_bad_block_marker(page, &mut marker);
            user[0][..2].copy_from_slice(&marker);
        }

        self.pages.insert(
            page,
            Page {
                data,
                user,
                uncorrectable: false,
                bitflips: 0,
                erased_from: None,
            },
        );
    }

    pub fn corrupt(&mut self, page: u32) {
        self.pages.get_mut(&page).unwrap().uncorrectable = true;
    }

    pub fn set_bitflips(&mut self, page: u32, bitflips: u8) {
        self.pages.get_mut(&page).unwrap().bitflips = bitflips;
    }

    /// Leave `page` programmed only up to `sector`, the rest reads as erased.
    pub fn erase_sectors_from(&mut self, page: u32, sector: u32) {
        let page_size = self.geometry.page_size().bytes() as usize;
        let start = self.geometry.data_offset(sector) as usize;
        let p = self.pages.get_mut(&page).unwrap();
        p.data[start..page_size].fill(0xff);
        p.user.truncate(sector as usize);
        p.erased_from = Some(sector);
    }

    pub fn reg(&self, offset: u32) -> u32 {
        self.regs.get(&offset).copied().unwrap_or(0)
    }

    pub fn ecc_reads(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::EccRead { .. }))
            .count()
    }

    pub fn dump_operations(&self) {
        println!("Operations:");
        for op in &self.operations {
            println!("  {:?}", op);
        }
    }

    /// Parity bytes of a sector as laid out behind its user bytes.
    pub fn parity(sector: u32) -> u8 {
        0xa5 ^ sector as u8
    }

    /// Page data followed by the spare area, as a raw transfer sees it.
    fn raw_page(&self, page: u32) -> Vec<u8> {
        let page_size = self.geometry.page_size().bytes() as usize;
        let spare = self.geometry.page_size().max_oob() as usize;
        let mut raw = vec![0xffu8; page_size + spare];

        if let Some(p) = self.pages.get(&page) {
            raw[..page_size].copy_from_slice(&p.data);

            let parity = ECC_BYTES[self.geometry.ecc_strength() as usize] as usize;
            let mut pos = page_size;
            for (sector, user) in p.user.iter().enumerate() {
                raw.resize(raw.len().max(pos + USER_DATA_BYTES + parity), 0xff);
                raw[pos..pos + USER_DATA_BYTES].copy_from_slice(user);
                raw[pos + USER_DATA_BYTES..pos + USER_DATA_BYTES + parity]
                    .fill(Self::parity(sector as u32));
                pos += USER_DATA_BYTES + parity;
            }
        }

        raw
    }

    fn execute(&mut self, cmd: Cmd) {
        self.commands += 1;
        println!(
            "    nfc: cmd 0x{:08X} #{:>3}",
            cmd.bits(),
            self.operations.len()
        );

        if self.hang {
            println!("    nfc: HANG");
            return;
        }

        let op = cmd.low_byte();
        let cmd1 = cmd.contains(Cmd::SEND_CMD1);

        if cmd1 && cmd.contains(Cmd::SEND_ADDR) && op == opcode::RNDOUT {
            self.column = self.reg(regs::ADDR_LOW) & 0xffff;
            self.operations.push(Operation::ChangeColumn {
                column: self.column,
            });
        } else if cmd1 && cmd.contains(Cmd::SEND_ADDR | Cmd::WAIT_FLAG) && op == opcode::READ0 {
            let cycles = cmd.addr_count();
            let low = self.reg(regs::ADDR_LOW) >> 16;
            let page = if cycles >= 5 {
                low | ((self.reg(regs::ADDR_HIGH) & 0xff) << 16)
            } else {
                low
            };
            self.loaded = Some((page, cycles));
            self.column = 0;
            self.operations.push(Operation::LoadPage { page, cycles });
        } else if cmd1 && op == opcode::RESET {
            self.loaded = None;
            self.operations.push(Operation::Reset);
        } else if cmd1 && op == opcode::READID {
            self.sram[..NAND_ID.len()].copy_from_slice(&NAND_ID);
            self.operations.push(Operation::ReadId);
        } else if cmd1 && op == opcode::STATUS {
            self.sram[0] = NAND_STATUS;
            self.operations.push(Operation::ReadStatus);
        } else if cmd.contains(Cmd::DATA_TRANS | Cmd::ECC_CMD) {
            self.ecc_read();
        } else if cmd.contains(Cmd::DATA_TRANS) {
            self.raw_read();
        }

        let st = self.reg(regs::ST) | Status::CMD_INT_FLAG.bits();
        self.regs.insert(regs::ST, st);
    }

    fn ecc_read(&mut self) {
        let cnt = self.reg(regs::CNT);
        let ctl = EccCtl::from_bits_retain(self.reg(regs::ECC_CTL));
        let page_size = Ctl::from_bits_retain(self.reg(regs::CTL)).page_size();
        let (page, cycles) = self.loaded.unwrap_or((u32::MAX, 0));
        let column = self.column;

        self.operations.push(Operation::EccRead {
            page,
            column,
            ecc_ctl: ctl.bits(),
        });

        let g = self.geometry;
        let ecc_size = if ctl.contains(EccCtl::BLOCK_512) {
            512
        } else {
            1024
        };
        let seed_ok = if g.randomize() {
            ctl.contains(EccCtl::RANDOM_EN)
                && ctl.seed() == randomizer::seed_for_period(page, g.nseeds()) & 0x7fff
        } else {
            !ctl.contains(EccCtl::RANDOM_EN)
        };

        let mut err_cnt = 0;
        let mut user_data = 0;
        let status = match self.pages.get(&page) {
            None => EccStatus::pat_found(0),
            Some(p) if p.erased_from.is_some_and(|s| column / ecc_size >= s) => {
                EccStatus::pat_found(0)
            }
            Some(p) => {
                let matches = ctl.contains(EccCtl::EN)
                    && cycles == g.addr_cycles().count()
                    && page_size == g.page_size().bytes()
                    && ecc_size == g.ecc_size().bytes()
                    && cnt == ecc_size
                    && ctl.strength() == g.ecc_strength()
                    && seed_ok
                    && column % ecc_size == 0
                    && column < page_size
                    && !p.uncorrectable;

                if matches {
                    let start = column as usize;
                    let len = ecc_size as usize;
                    self.sram[..len].copy_from_slice(&p.data[start..start + len]);
                    user_data = u32::from_le_bytes(p.user[(column / ecc_size) as usize]);
                    err_cnt = p.bitflips as u32;
                    EccStatus::empty()
                } else {
                    EccStatus::err(0)
                }
            }
        };

        self.regs.insert(regs::user_data(0), user_data);
        self.regs.insert(regs::ecc_err_cnt(0), err_cnt);
        self.regs.insert(regs::ECC_ST, status.bits());
        self.column += cnt;
    }

    fn raw_read(&mut self) {
        let len = self.reg(regs::CNT) as usize;
        let column = self.column;
        self.operations.push(Operation::RawRead { column, len });

        let page = self.loaded.map(|(page, _)| page).unwrap_or(u32::MAX);
        let raw = self.raw_page(page);
        for (i, byte) in self.sram[..len].iter_mut().enumerate() {
            *byte = raw.get(column as usize + i).copied().unwrap_or(0xff);
        }
        self.column += len as u32;
    }
}

impl Registers for Flash {
    fn read32(&mut self, offset: u32) -> u32 {
        if (regs::RAM0_BASE..regs::RAM0_BASE + regs::SRAM_SIZE as u32).contains(&offset) {
            let start = (offset - regs::RAM0_BASE) as usize;
            let mut word = [0u8; 4];
            word.copy_from_slice(&self.sram[start..start + 4]);
            return u32::from_le_bytes(word);
        }

        let value = self.reg(offset);
        if offset == regs::ST && self.fifo_stuck {
            return value | Status::CMD_FIFO_BUSY.bits();
        }
        value
    }

    fn write32(&mut self, offset: u32, value: u32) {
        match offset {
            // write one to clear
            regs::ST => {
                let st = self.reg(regs::ST) & !value;
                self.regs.insert(regs::ST, st);
            }
            regs::CTL if !self.reset_stuck => {
                self.regs.insert(regs::CTL, value & !Ctl::RESET.bits());
            }
            regs::CMD => {
                self.regs.insert(regs::CMD, value);
                self.execute(Cmd::from_bits_retain(value));
            }
            _ => {
                self.regs.insert(offset, value);
            }
        }
    }

    fn release(&mut self) {
        self.released = true;
    }
}

impl Delay for Flash {
    fn delay_us(&mut self, us: u32) {
        self.elapsed_us += us as u64;
    }
}

/// Recognizable content of `page`, different for every page and sector.
pub fn pattern(page: u32, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| (page as usize * 7 + i / 3 + (i >> 10)) as u8)
        .collect()
}

/// Expected image of `pages` consecutive pages starting at `first`.
pub fn image(first: u32, pages: u32, page_size: usize) -> Vec<u8> {
    (first..first + pages)
        .flat_map(|page| pattern(page, page_size))
        .collect()
}
