use crate::error::Unimplemented;
use crate::instruction::Instruction;
use crate::translator::Translator;

pub type Handler = fn(&mut Translator, Instruction) -> Result<(), Unimplemented>;

#[derive(Copy, Clone)]
pub enum Entry {
    Invalid,
    Instruction(&'static str, Handler),
    /// Resolves the extended opcode in a sub-table.
    Table(fn(Instruction) -> &'static Entry),
}

macro_rules! op {
    ($name:ident) => {
        Entry::Instruction(stringify!($name), Translator::$name)
    };
}

/// Recognised encodings the translator cannot lower yet.
macro_rules! unsupported {
    ($name:literal) => {
        Entry::Instruction($name, Translator::unsupported)
    };
}

static PRIMARY_TABLE: [Entry; 64] = build_primary_table();
static TABLE19: [Entry; 1024] = build_table19();
static TABLE30: [Entry; 8] = build_table30();
static TABLE31: [Entry; 1024] = build_table31();
static TABLE58: [Entry; 4] = build_table58();
static TABLE62: [Entry; 4] = build_table62();

fn table19(code: Instruction) -> &'static Entry {
    &TABLE19[code.xo()]
}

fn table30(code: Instruction) -> &'static Entry {
    &TABLE30[code.md_xo()]
}

fn table31(code: Instruction) -> &'static Entry {
    &TABLE31[code.xo()]
}

fn table58(code: Instruction) -> &'static Entry {
    &TABLE58[code.ds_xo()]
}

fn table62(code: Instruction) -> &'static Entry {
    &TABLE62[code.ds_xo()]
}

const fn build_primary_table() -> [Entry; 64] {
    let mut t = [Entry::Invalid; 64];

    t[2] = unsupported!("tdi");
    t[3] = unsupported!("twi");
    t[7] = op!(mulli);
    t[8] = op!(subfic);
    t[10] = op!(cmpli);
    t[11] = op!(cmpi);
    t[12] = op!(addic);
    t[13] = op!(addic_);
    t[14] = op!(addi);
    t[15] = op!(addis);
    t[16] = unsupported!("bc");
    t[17] = unsupported!("sc");
    t[18] = unsupported!("b");
    t[19] = Entry::Table(table19);
    t[20] = op!(rlwimix);
    t[21] = op!(rlwinmx);
    t[23] = op!(rlwnmx);
    t[24] = op!(ori);
    t[25] = op!(oris);
    t[26] = op!(xori);
    t[27] = op!(xoris);
    t[28] = op!(andi_);
    t[29] = op!(andis_);
    t[30] = Entry::Table(table30);
    t[31] = Entry::Table(table31);
    t[32] = op!(lwz);
    t[33] = op!(lwzu);
    t[34] = op!(lbz);
    t[35] = op!(lbzu);
    t[36] = op!(stw);
    t[37] = op!(stwu);
    t[38] = op!(stb);
    t[39] = op!(stbu);
    t[40] = op!(lhz);
    t[41] = op!(lhzu);
    t[42] = op!(lha);
    t[43] = op!(lhau);
    t[44] = op!(sth);
    t[45] = op!(sthu);
    t[46] = op!(lmw);
    t[47] = op!(stmw);
    t[48] = op!(lfs);
    t[49] = op!(lfsu);
    t[50] = op!(lfd);
    t[51] = op!(lfdu);
    t[52] = op!(stfs);
    t[53] = op!(stfsu);
    t[54] = op!(stfd);
    t[55] = op!(stfdu);
    t[58] = Entry::Table(table58);
    t[62] = Entry::Table(table62);

    t
}

const fn build_table19() -> [Entry; 1024] {
    let mut t = [Entry::Invalid; 1024];

    t[16] = unsupported!("bclr");
    t[150] = op!(isync);
    t[528] = unsupported!("bcctr");

    t
}

const fn build_table30() -> [Entry; 8] {
    let mut t = [Entry::Invalid; 8];

    t[0] = op!(rldiclx);
    t[1] = op!(rldicrx);
    t[2] = op!(rldicx);
    t[3] = op!(rldimix);
    // rldcl and rldcr share this slot; their sub-opcode is in bit 1.
    t[4] = op!(rldc_lr);

    t
}

const fn build_table31() -> [Entry; 1024] {
    let mut t = [Entry::Invalid; 1024];

    // XO-forms appear twice: with and without the OE bit.
    macro_rules! xo {
        ($xo:expr, $name:ident) => {
            t[$xo] = op!($name);
            t[$xo | 0x200] = op!($name);
        };
    }

    t[0] = op!(cmp);
    xo!(8, subfcx);
    t[9] = op!(mulhdux);
    xo!(10, addcx);
    t[11] = op!(mulhwux);
    t[19] = unsupported!("mfcr");
    t[20] = op!(lwarx);
    t[21] = op!(ldx);
    t[23] = op!(lwzx);
    t[24] = op!(slwx);
    t[26] = op!(cntlzwx);
    t[27] = op!(sldx);
    t[28] = op!(andx);
    t[32] = op!(cmpl);
    xo!(40, subfx);
    t[53] = op!(ldux);
    t[55] = op!(lwzux);
    t[58] = op!(cntlzdx);
    t[60] = op!(andcx);
    t[73] = op!(mulhdx);
    t[75] = op!(mulhwx);
    t[84] = op!(ldarx);
    t[87] = op!(lbzx);
    xo!(104, negx);
    t[119] = op!(lbzux);
    t[124] = op!(norx);
    xo!(136, subfex);
    xo!(138, addex);
    t[144] = unsupported!("mtcrf");
    t[149] = op!(stdx);
    t[150] = op!(stwcx_);
    t[151] = op!(stwx);
    t[181] = op!(stdux);
    t[183] = op!(stwux);
    xo!(200, subfzex);
    xo!(202, addzex);
    t[214] = op!(stdcx_);
    t[215] = op!(stbx);
    xo!(232, subfmex);
    xo!(233, mulldx);
    xo!(234, addmex);
    xo!(235, mullwx);
    t[247] = op!(stbux);
    xo!(266, addx);
    t[279] = op!(lhzx);
    t[284] = op!(eqvx);
    t[311] = op!(lhzux);
    t[316] = op!(xorx);
    t[339] = unsupported!("mfspr");
    t[341] = op!(lwax);
    t[343] = op!(lhax);
    t[373] = op!(lwaux);
    t[375] = op!(lhaux);
    t[407] = op!(sthx);
    t[412] = op!(orcx);
    t[439] = op!(sthux);
    t[444] = op!(orx);
    xo!(457, divdux);
    xo!(459, divwux);
    t[467] = unsupported!("mtspr");
    t[476] = op!(nandx);
    xo!(489, divdx);
    xo!(491, divwx);
    t[532] = op!(ldbrx);
    t[533] = op!(lswx);
    t[534] = op!(lwbrx);
    t[535] = op!(lfsx);
    t[536] = op!(srwx);
    t[539] = op!(srdx);
    t[567] = op!(lfsux);
    t[597] = op!(lswi);
    t[598] = op!(sync);
    t[599] = op!(lfdx);
    t[631] = op!(lfdux);
    t[660] = op!(stdbrx);
    t[661] = op!(stswx);
    t[662] = op!(stwbrx);
    t[663] = op!(stfsx);
    t[695] = op!(stfsux);
    t[725] = op!(stswi);
    t[727] = op!(stfdx);
    t[759] = op!(stfdux);
    t[790] = op!(lhbrx);
    t[792] = op!(srawx);
    t[794] = op!(sradx);
    t[824] = op!(srawix);
    // XS-form: the sixth shift bit sits where X-forms keep the low xo bit.
    t[826] = op!(sradix);
    t[827] = op!(sradix);
    t[854] = op!(eieio);
    t[918] = op!(sthbrx);
    t[922] = op!(extshx);
    t[954] = op!(extsbx);
    t[983] = op!(stfiwx);
    t[986] = op!(extswx);

    t
}

const fn build_table58() -> [Entry; 4] {
    let mut t = [Entry::Invalid; 4];

    t[0] = op!(ld);
    t[1] = op!(ldu);
    t[2] = op!(lwa);

    t
}

const fn build_table62() -> [Entry; 4] {
    let mut t = [Entry::Invalid; 4];

    t[0] = op!(std);
    t[1] = op!(stdu);

    t
}

/// Walks the sub-tables down to a leaf. Never returns `Entry::Table`.
pub fn get_entry(code: Instruction) -> &'static Entry {
    let mut entry = &PRIMARY_TABLE[code.opcode() as usize];
    while let Entry::Table(next) = entry {
        entry = next(code);
    }
    entry
}
