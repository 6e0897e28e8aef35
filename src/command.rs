use crate::error::Error;
use crate::geometry::Geometry;
use crate::platform::Platform;
use crate::regs::{self, Cmd, Ctl, EccCtl, Status, opcode};
use crate::NandSpl;
#[cfg(feature = "defmt")]
use defmt::{trace, warn};

pub(crate) const ID_LENGTH: usize = 6;

impl<T: Platform> NandSpl<T> {
    /// Busy wait in 1µs steps until `done` accepts the register value at `offset`.
    fn poll(&mut self, offset: u32, done: impl Fn(u32) -> bool) -> Result<(), Error> {
        for _ in 0..regs::POLL_ITERATIONS {
            if done(self.hal.read32(offset)) {
                return Ok(());
            }
            self.hal.delay_us(1);
        }

        #[cfg(feature = "defmt")]
        warn!("poll: timeout @{:#04x}", offset);

        #[cfg(feature = "debug-logs")]
        println!("  command: timeout polling 0x{offset:02x}");

        Err(Error::Timeout)
    }

    pub(crate) fn wait_cmd_fifo_empty(&mut self) -> Result<(), Error> {
        self.poll(regs::ST, |st| {
            !Status::from_bits_retain(st).contains(Status::CMD_FIFO_BUSY)
        })
    }

    pub(crate) fn wait_int(&mut self) -> Result<(), Error> {
        self.poll(regs::ST, |st| {
            Status::from_bits_retain(st).contains(Status::CMD_INT_FLAG)
        })
    }

    /// Clear the completion flag and push a command once the FIFO drained.
    fn issue(&mut self, cmd: Cmd) -> Result<(), Error> {
        self.wait_cmd_fifo_empty()?;

        #[cfg(feature = "defmt")]
        trace!("issue: cmd {:#010x}", cmd.bits());

        #[cfg(feature = "debug-logs")]
        println!("  command: issue 0x{:08x}", cmd.bits());

        self.hal.write32(regs::ST, Status::CMD_INT_FLAG.bits());
        self.hal.write32(regs::CMD, cmd.bits());
        Ok(())
    }

    /// Issue one controller command and block until it completed.
    ///
    /// Both the FIFO drain and the completion flag are bounded by `POLL_ITERATIONS` µs.
    pub fn exec_command(&mut self, cmd: Cmd) -> Result<(), Error> {
        self.issue(cmd)?;
        self.wait_int()
    }

    /// Move the read cursor to `column` within the loaded page.
    pub fn change_column(&mut self, column: u32) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("change_column: {:#06x}", column);

        self.hal.write32(
            regs::RCMD_SET,
            regs::rcmd_set(opcode::RNDOUTSTART, opcode::RNDOUT, opcode::RNDOUTSTART),
        );
        self.hal.write32(regs::ADDR_LOW, column & 0xffff);

        self.exec_command(
            Cmd::SEND_CMD1
                | Cmd::SEND_CMD2
                | Cmd::SEND_ADDR
                | Cmd::addr_cycles(2)
                | Cmd::opcode(opcode::RNDOUT),
        )?;

        self.hal.delay_us(regs::COLUMN_SETTLE_US);
        Ok(())
    }

    /// Load the page containing `offset` into the device cache, addressed with the
    /// geometry's address cycles. The column is left at 0.
    pub fn load_page(&mut self, geometry: &Geometry, offset: u32) -> Result<(), Error> {
        let page = geometry.page_of(offset);

        #[cfg(feature = "defmt")]
        trace!("load_page: {} ({} cycles)", page, geometry.addr_cycles.count());

        #[cfg(feature = "debug-logs")]
        println!(
            "  command: load_page {page} ({} cycles)",
            geometry.addr_cycles.count()
        );

        self.hal.write32(
            regs::RCMD_SET,
            regs::rcmd_set(opcode::READSTART, opcode::RNDOUT, opcode::RNDOUTSTART),
        );
        self.hal.write32(regs::ADDR_LOW, (page & 0xffff) << 16);
        self.hal.write32(regs::ADDR_HIGH, (page >> 16) & 0xff);

        self.issue(
            Cmd::SEND_CMD1
                | Cmd::SEND_CMD2
                | Cmd::SEND_ADDR
                | Cmd::WAIT_FLAG
                | Cmd::addr_cycles(geometry.addr_cycles.count())
                | Cmd::opcode(opcode::READ0),
        )?;
        self.hal.delay_us(regs::PAGE_LOAD_SETTLE_US);
        self.wait_int()
    }

    /// Program page size, transfer count and spare area location for `geometry`.
    pub fn apply_geometry(&mut self, geometry: &Geometry) -> Result<(), Error> {
        self.wait_cmd_fifo_empty()?;

        let ctl = Ctl::from_bits_retain(self.hal.read32(regs::CTL)) - Ctl::PAGE_SHIFT_MASK;
        self.hal.write32(
            regs::CTL,
            (ctl | Ctl::RAM_METHOD | Ctl::page_shift(geometry.page_size.bytes())).bits(),
        );
        self.hal.write32(regs::CNT, geometry.ecc_size.bytes());
        self.hal.write32(regs::SPARE_AREA, geometry.page_size.bytes());
        Ok(())
    }

    /// Select chip 0 and keep CE asserted between commands.
    pub(crate) fn select_chip(&mut self) {
        let ctl = Ctl::from_bits_retain(self.hal.read32(regs::CTL)) - Ctl::CE_SEL_MASK;
        self.hal.write32(regs::CTL, (ctl | Ctl::chip_select(0) | Ctl::CE_CTL).bits());
    }

    pub(crate) fn disable_ecc(&mut self) {
        let ctl = EccCtl::from_bits_retain(self.hal.read32(regs::ECC_CTL)) - EccCtl::EN;
        self.hal.write32(regs::ECC_CTL, ctl.bits());
    }

    /// Raw transfer from the current column, in SRAM sized pieces.
    pub(crate) fn read_buf(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        for chunk in buf.chunks_mut(regs::SRAM_SIZE) {
            self.wait_cmd_fifo_empty()?;
            self.hal.write32(regs::CNT, chunk.len() as u32);
            self.exec_command(Cmd::DATA_TRANS | Cmd::DATA_SWAP_METHOD)?;
            self.hal.read_sram(regs::RAM0_BASE, chunk);
        }
        Ok(())
    }

    /// Enable and reset the controller, then reset the NAND device.
    pub fn init(&mut self) -> Result<(), Error> {
        self.hal.write32(regs::TIMING_CFG, regs::TIMING_CFG_DEFAULT);
        self.hal.write32(regs::ECC_CTL, 0);

        let ctl = Ctl::from_bits_retain(self.hal.read32(regs::CTL));
        self.hal.write32(regs::CTL, (ctl | Ctl::EN | Ctl::RESET).bits());
        self.poll(regs::CTL, |ctl| {
            !Ctl::from_bits_retain(ctl).contains(Ctl::RESET)
        })?;

        self.exec_command(Cmd::SEND_CMD1 | Cmd::WAIT_FLAG | Cmd::opcode(opcode::RESET))
    }

    /// Read the 6 byte manufacturer and device ID.
    pub fn read_id(&mut self) -> Result<[u8; ID_LENGTH], Error> {
        self.select_chip();

        self.hal.write32(regs::ADDR_LOW, 0);
        self.hal.write32(regs::ADDR_HIGH, 0);
        let ctl = Ctl::from_bits_retain(self.hal.read32(regs::CTL)) - Ctl::RAM_METHOD;
        self.hal.write32(regs::CTL, ctl.bits());
        self.hal.write32(regs::CNT, ID_LENGTH as u32);

        self.exec_command(
            Cmd::SEND_CMD1
                | Cmd::SEND_ADDR
                | Cmd::addr_cycles(1)
                | Cmd::DATA_TRANS
                | Cmd::opcode(opcode::READID),
        )?;

        let mut id = [0u8; ID_LENGTH];
        self.hal.read_sram(regs::RAM0_BASE, &mut id);

        #[cfg(feature = "defmt")]
        trace!("read_id: {:x}", id);

        Ok(id)
    }

    /// Read the device status byte.
    pub fn read_status(&mut self) -> Result<u8, Error> {
        let ctl = Ctl::from_bits_retain(self.hal.read32(regs::CTL));
        self.hal.write32(regs::CTL, (ctl - Ctl::RB_SEL - Ctl::RAM_METHOD).bits());
        self.hal.write32(regs::CNT, 1);

        self.exec_command(Cmd::SEND_CMD1 | Cmd::DATA_TRANS | Cmd::opcode(opcode::STATUS))?;

        let mut status = [0u8; 1];
        self.hal.read_sram(regs::RAM0_BASE, &mut status);
        Ok(status[0])
    }
}
