//! ELF enumeration catalogs.

use crate::formats::members;
use crate::schema::{EnumDomain, EnumFamily, IntKind};
use std::sync::Arc;

catalog! {
    /// First four bytes of every ELF image.
    pub fn magic() -> Arc<EnumDomain> {
        EnumDomain::patterns("Magic", 4, &[("elf", &b"\x7fELF"[..])])
    }
}

catalog! {
    /// `EI_CLASS`.
    pub fn word_size() -> Arc<EnumDomain> {
        EnumDomain::ints("WordSize", IntKind::U8, &[("Bits32", 1), ("Bits64", 2)])
    }
}

catalog! {
    /// `EI_DATA`.
    pub fn byte_order() -> Arc<EnumDomain> {
        EnumDomain::ints("ByteOrder", IntKind::U8, &[("Lsb", 1), ("Msb", 2)])
    }
}

catalog! {
    pub fn ident_version() -> Arc<EnumDomain> {
        EnumDomain::ints("Version", IntKind::U8, &[("Current", 1)])
    }
}

catalog! {
    pub fn file_version() -> Arc<EnumDomain> {
        EnumDomain::ints("FileVersion", IntKind::U32, &[("Current", 1)])
    }
}

catalog! {
    pub fn os_abi() -> Arc<EnumDomain> {
        EnumDomain::ints(
            "OsAbi",
            IntKind::U8,
            &members(&[
                (0, &["SysV", "HpUx", "NetBsd", "Gnu"]),
                (6, &["Solaris", "Aix", "Irix", "FreeBsd", "Tru64", "Modesto", "OpenBsd"]),
                (64, &["ArmAeabi"]),
                (97, &["Arm"]),
                (255, &["Standalone"]),
            ]),
        )
    }
}

catalog! {
    /// `e_type`.
    pub fn file_type() -> Arc<EnumDomain> {
        EnumDomain::ints(
            "Type",
            IntKind::U16,
            &members(&[(0, &["None", "Rel", "Exec", "Dyn", "Core"])]),
        )
    }
}

catalog! {
    /// `e_machine`.
    pub fn machine() -> Arc<EnumDomain> {
        EnumDomain::ints(
            "Machine",
            IntKind::U16,
            &members(&[
                (0, &["None", "M32", "Sparc", "I386", "M68K", "M88K"]),
                (7, &["I860", "Mips", "S370", "MipsRs3Le"]),
                (15, &["PaRisc"]),
                (17, &["Vpp500", "Sparc32Plus", "I960", "PPC", "PPC64", "S390"]),
                (36, &["V800", "Fr20", "Rh32", "Rce", "Arm", "FakeAlpha", "Sh", "SparcV9"]),
                (44, &["TriCore", "Arc", "H8_300", "H8_300H", "H8S", "H8_500", "IA64", "MipsX"]),
                (52, &["ColdFire", "M68HC12", "Mma", "Pcp", "Ncpu", "Ndr1", "StarCore", "Me16"]),
                (60, &["St100", "TinyJ", "X86_64", "Pdsp"]),
                (66, &["Fx66", "St9Plus", "St7", "M68HC16", "M68HC11", "M68HC08", "M68HC05", "Svx"]),
                (74, &["St19", "Vax", "Cris", "Javelin", "FirePath", "Zsp", "Mmix", "Huany"]),
                (82, &["Prism", "Avr", "Fr30", "D10V", "D30V", "V850", "M32R", "Mn10300"]),
                (90, &["Mn10200", "Pj", "OpenRisc", "ArcA5", "Xtensa"]),
                (113, &["AlteraNios2"]),
                (183, &["AArch64"]),
                (188, &["TilePro", "MicroBlaze"]),
                (191, &["TileGx"]),
                (243, &["RiscV"]),
                (258, &["LoongArch"]),
            ]),
        )
    }
}

catalog! {
    /// `p_type`.
    pub fn segment_type() -> Arc<EnumDomain> {
        EnumDomain::ints(
            "PType",
            IntKind::U32,
            &members(&[
                (0, &["Null", "Load", "Dynamic", "Interp", "Note", "ShLib", "Phdr", "Tls"]),
                (
                    0x6474e550,
                    &["GnuEhFrame", "GnuStack", "GnuRelro", "GnuProperty", "GnuSframe"],
                ),
                (0x65041580, &["PaxFlags"]),
                (0x65a3dbe6, &["OpenbsdRandomize", "OpenbsdWxNeeded"]),
                (0x65a41be6, &["OpenbsdBootdata"]),
                (0x6ffffffa, &["SunwBss", "SunwStack"]),
                (0x70000000, &["ArchExt0", "ArchExt1", "ArchExt2", "ArchExt3"]),
            ]),
        )
    }
}

catalog! {
    /// `sh_type`.
    pub fn section_type() -> Arc<EnumDomain> {
        EnumDomain::ints(
            "SType",
            IntKind::U32,
            &members(&[
                (0, &["Null", "ProgBits", "SymTab", "StrTab", "Rela", "Hash", "Dynamic"]),
                (7, &["Note", "NoBits", "Rel", "ShLib", "DynSym"]),
                (14, &["InitArray", "FiniArray", "PreinitArray", "Group", "SymTabShndx"]),
                (19, &["Relr"]),
                (0x6ffffff5, &["GnuAttributes", "GnuHash", "GnuLibList", "Checksum"]),
                (0x6ffffffd, &["GnuVerDef", "GnuVerNeed", "GnuVerSym"]),
            ]),
        )
    }
}

catalog! {
    /// Auxiliary vector `a_type`.
    pub fn auxv_type() -> Arc<EnumDomain> {
        EnumDomain::ints(
            "AuxvType",
            IntKind::WORD,
            &members(&[
                (0, &["Null", "Ignore", "ExecFd", "Phdr", "PhEnt", "PhNum", "PageSz", "Base"]),
                (8, &["Flags", "Entry", "NotElf", "Uid", "Euid", "Gid", "Egid", "Platform"]),
                (16, &["HwCap", "ClkTck", "FpuCw", "DCacheBSize", "ICacheBSize", "UCacheBSize"]),
                (22, &["IgnorePpc", "Secure", "BasePlatform", "Random", "HwCap2"]),
                (27, &["RseqFeatureSize", "RseqAlign", "HwCap3", "HwCap4"]),
                (31, &["ExecFn", "SysInfo", "SysInfoEhdr", "L1ICacheShape"]),
                (35, &["L1DCacheShape", "L2CacheShape", "L3CacheShape"]),
                (40, &["L1ICacheSize", "L1ICacheGeometry", "L1DCacheSize", "L1DCacheGeometry"]),
                (44, &["L2CacheSize", "L2CacheGeometry", "L3CacheSize", "L3CacheGeometry"]),
                (51, &["MinSigStkSz"]),
            ]),
        )
    }
}

fn dtag_base() -> crate::error::Result<Arc<EnumDomain>> {
    EnumDomain::ints(
        "DTag",
        IntKind::WORD,
        &members(&[
            (0, &["Null", "Needed", "PltRelSz", "PltGot", "Hash"]),
            (5, &["StrTab", "SymTab", "Rela", "RelaSz", "RelaEnt"]),
            (10, &["StrSz", "SymEnt", "Init", "Fini", "SoName"]),
            (15, &["RPath", "Symbolic", "Rel", "RelSz", "RelEnt"]),
            (20, &["PltRel", "Debug", "TextRel", "JmpRel", "BindNow"]),
            (25, &["InitArray", "FiniArray", "InitArraySz", "FiniArraySz", "RunPath"]),
            (30, &["Flags"]),
            (32, &["PreinitArray", "PreinitArraySz", "SymTabShndx"]),
            (35, &["RelrSz", "Relr", "RelrEnt"]),
            (0x6ffffdf5, &["GnuPrelinked", "GnuConflictSz", "GnuLibListSz", "Checksum"]),
            (0x6ffffdf9, &["PltPadSz", "MoveEnt", "MoveSz", "Feature1", "PosFlag1"]),
            (0x6ffffdfe, &["SymInSz", "SymInEnt"]),
            (0x6ffffef5, &["GnuHash", "TlsDescPlt", "TlsDescGot", "GnuConflict", "GnuLibList"]),
            (0x6ffffefa, &["Config", "DepAudit", "Audit", "PltPad", "MoveTab", "SymInfo"]),
            (0x6ffffff0, &["VerSym"]),
            (0x6ffffff9, &["RelaCount", "RelCount", "Flags1"]),
            (0x6ffffffc, &["VerDef", "VerDefNum", "VerNeed", "VerNeedNum"]),
        ]),
    )
}

catalog! {
    /// Dynamic section tags, extended per machine.
    pub fn dtag() -> EnumFamily {
        EnumFamily::new(dtag_base()?)
            .with_context(
                "PPC64",
                &members(&[(0x70000000, &["Glink", "Opd", "OpdSz", "Opt"])]),
            )?
            .with_context(
                "AArch64",
                &[("BtiPlt", 0x70000001), ("PacPlt", 0x70000003), ("VariantPcs", 0x70000005)],
            )?
            .with_context(
                "X86_64",
                &[("Plt", 0x70000000), ("PltSz", 0x70000001), ("PltEnt", 0x70000003)],
            )
    }
}

catalog! {
    /// `r_debug.r_state`.
    pub fn debug_state() -> Arc<EnumDomain> {
        EnumDomain::ints(
            "DebugState",
            IntKind::WORD,
            &[("Consistent", 0), ("Add", 1), ("Delete", 2)],
        )
    }
}

catalog! {
    /// Note types, keyed by the note's owner name.
    pub fn note_type() -> EnumFamily {
        let core = members(&[
            (1, &["PrStatus", "FpRegSet", "PrPsInfo", "PrXReg", "Platform", "Auxv", "GWindows", "Asrs"]),
            (10, &["PStatus"]),
            (13, &["PsInfo", "PrCred", "UtsName", "LwpStatus", "LwpsInfo"]),
            (20, &["PrFpxReg"]),
            (0x100, &["PpcVmx", "PpcSpe", "PpcVsx"]),
            (0x200, &["I386Tls", "I386IoPerm", "X86XState"]),
            (0x300, &["S390HighGprs", "S390Timer", "S390TodCmp", "S390TodPreg", "S390Ctrs"]),
            (0x305, &["S390Prefix", "S390LastBreak", "S390SystemCall", "S390Tdb"]),
            (0x400, &["ArmVfp", "ArmTls", "ArmHwBreak", "ArmHwWatch"]),
            (0x46494c45, &["File"]),
            (0x46e62b7f, &["PrXFpReg"]),
            (0x53494749, &["SigInfo"]),
        ]);
        EnumFamily::new(EnumDomain::ints("NoteType", IntKind::U32, &[])?)
            .with_context(
                "GNU",
                &members(&[(1, &["AbiTag", "HwCap", "BuildId", "GoldVersion", "PropertyType0"])]),
            )?
            .with_context("CORE", &core)?
            .with_alias("LINUX", "CORE")?
            .with_context("Linux", &[("Version", 0)])?
            .with_context("stapsdt", &[("Version3", 3)])
    }
}
