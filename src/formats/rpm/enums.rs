//! RPM enumeration catalogs.
//!
//! Tag numbers follow `lib/rpmtag.h` of the rpm project.

use crate::formats::members;
use crate::schema::{EnumDomain, IntKind};
use std::sync::Arc;

catalog! {
    pub fn lead_magic() -> Arc<EnumDomain> {
        EnumDomain::patterns("LeadMagic", 4, &[("magic", &b"\xed\xab\xee\xdb"[..])])
    }
}

catalog! {
    pub fn header_magic() -> Arc<EnumDomain> {
        EnumDomain::patterns("HeaderMagic", 3, &[("magic", &b"\x8e\xad\xe8"[..])])
    }
}

catalog! {
    pub fn header_version() -> Arc<EnumDomain> {
        EnumDomain::ints("HeaderVersion", IntKind::U8, &[("version", 1)])
    }
}

catalog! {
    /// Lead package type.
    pub fn package_type() -> Arc<EnumDomain> {
        EnumDomain::ints("Type", IntKind::U16, &[("binary", 0), ("source", 1)])
    }
}

catalog! {
    pub fn os_num() -> Arc<EnumDomain> {
        EnumDomain::ints("OsNum", IntKind::U16, &[("linux", 1)])
    }
}

catalog! {
    /// Lead signature type.
    pub fn sig_type() -> Arc<EnumDomain> {
        EnumDomain::ints("Sig", IntKind::U16, &[("version3", 5)])
    }
}

catalog! {
    /// Storage type of a header entry.
    pub fn tag_type() -> Arc<EnumDomain> {
        EnumDomain::ints(
            "TagType",
            IntKind::U32,
            &members(&[(
                0,
                &["null", "char", "int8", "int16", "int32", "int64", "string", "binary", "stringarray", "i18n"],
            )]),
        )
    }
}

catalog! {
    /// Tags of the signature header.
    pub fn signature_tag() -> Arc<EnumDomain> {
        EnumDomain::ints(
            "SigTag",
            IntKind::U32,
            &members(&[
                (62, &["signatures"]),
                (267, &["dsa", "rsa", "sha1", "longsize", "longarchivesize"]),
                (273, &["sha256"]),
                (1000, &["size"]),
                (1002, &["pgp"]),
                (1004, &["md5", "gpg"]),
                (1007, &["payloadsize", "reservedspace"]),
            ]),
        )
    }
}

catalog! {
    /// Tags of the main header.
    pub fn header_tag() -> Arc<EnumDomain> {
        EnumDomain::ints(
            "HeaderTag",
            IntKind::U32,
            &members(&[
                (63, &["immutable"]),
                (100, &["i18ntable"]),
                (1000, &["name", "version", "release", "epoch", "summary", "description"]),
                (1006, &["buildtime", "buildhost", "installtime", "size", "distribution", "vendor"]),
                (1014, &["license", "packager", "group", "changelog", "source", "patch", "url"]),
                (1021, &["os", "arch", "prein", "postin", "preun", "postun"]),
                (1028, &["filesizes", "filestates", "filemodes"]),
                (1033, &["filerdevs", "filemtimes", "filedigests", "filelinktos", "fileflags"]),
                (1039, &["fileusername", "filegroupname"]),
                (1044, &["sourcerpm", "fileverifyflags"]),
                (1047, &["providename", "requireflags", "requirename", "requireversion"]),
                (1053, &["conflictflags", "conflictname", "conflictversion"]),
                (1059, &["excludearch", "excludeos", "exclusivearch", "exclusiveos"]),
                (1064, &["rpmversion", "triggerscripts", "triggername", "triggerversion"]),
                (1068, &["triggerflags", "triggerindex"]),
                (1080, &["changelogtime", "changelogname", "changelogtext"]),
                (1085, &["preinprog", "postinprog", "preunprog", "postunprog", "buildarchs"]),
                (1090, &["obsoletename"]),
                (1092, &["triggerscriptprog", "docdir", "cookie", "filedevices", "fileinodes"]),
                (1097, &["filelangs", "prefixes"]),
                (1112, &["provideflags", "provideversion", "obsoleteflags", "obsoleteversion"]),
                (1116, &["dirindexes", "basenames", "dirnames"]),
                (1122, &["optflags"]),
                (1124, &["payloadformat", "payloadcompressor", "payloadflags"]),
                (1131, &["rhnplatform", "platform"]),
                (1140, &["filecolors", "fileclass", "classdict", "filedependsx", "filedependsn"]),
                (1145, &["dependsdict", "sourcepkgid"]),
                (1151, &["pretrans", "posttrans", "pretransprog", "posttransprog"]),
                (5010, &["filecaps", "filedigestalgo"]),
                (5035, &["ordername", "orderversion", "orderflags"]),
                (5046, &["recommendname", "recommendversion", "recommendflags"]),
                (5049, &["suggestname", "suggestversion", "suggestflags"]),
                (5062, &["encoding"]),
                (5092, &["payloaddigest", "payloaddigestalgo"]),
            ]),
        )
    }
}
