use propack::{rnc,Error,Method,Options,STD_OPTIONS};

// Deterministic pseudo-random bytes, so failures can be reproduced.
fn lcg_bytes(seed: u32,n: usize) -> Vec<u8> {
    let mut x = seed;
    (0..n).map(|_| {
        x = x.wrapping_mul(1103515245).wrapping_add(12345);
        (x >> 16) as u8
    }).collect()
}

// Text-like data with plenty of repeats at varying distances.
fn words(seed: u32,n: usize) -> Vec<u8> {
    let vocab = ["alpha ","beta ","gamma ","delta ","\n","epsilon ","zeta, ","eta. "];
    let mut ans = Vec::new();
    for r in lcg_bytes(seed,n) {
        ans.extend_from_slice(vocab[r as usize % vocab.len()].as_bytes());
        if r == 0 {
            ans.extend(lcg_bytes(r as u32 + ans.len() as u32,40));
        }
    }
    ans
}

fn opt(method: Method,key: u16) -> Options {
    Options { method, key, ..STD_OPTIONS }
}

fn round_trip(dat: &[u8]) {
    for method in [Method::Huffman,Method::Fast] {
        for key in [0,0x1234] {
            let packed = rnc::pack_slice(dat,&opt(method,key)).expect("pack failed");
            let unpacked = rnc::unpack_slice(&packed,&opt(method,key)).expect("unpack failed");
            assert_eq!(unpacked,dat,"{:?} with key {:04X}",method,key);
        }
    }
}

#[test]
fn round_trips() {
    round_trip(&words(7,600));
    round_trip(&lcg_bytes(3,5000));
    round_trip(&vec![0;19]);
    round_trip(&(0..70000u32).map(|i| i as u8).collect::<Vec<u8>>());
}

#[test]
fn many_chunks() {
    // more than 64K, so the output window flushes and chunks number more than a few
    let mut dat = Vec::new();
    for i in 0..300 {
        dat.extend(lcg_bytes(i,200));
        let s = dat.len() / 3;
        dat.extend_from_slice(&dat[s..s+60].to_vec());
    }
    assert!(dat.len() > 0x10000);
    round_trip(&dat);
}

#[test]
fn small_dictionary() {
    let dat = words(5,1500);
    for method in [Method::Huffman,Method::Fast] {
        let o = Options { method, dict_size: 300, ..STD_OPTIONS };
        let packed = rnc::pack_slice(&dat,&o).expect("pack failed");
        let full = rnc::pack_slice(&dat,&opt(method,0)).expect("pack failed");
        assert!(packed.len() >= full.len());
        assert_eq!(rnc::unpack_slice(&packed,&STD_OPTIONS).expect("unpack failed"),dat);
    }
}

#[test]
fn packed_crc_gate() {
    let dat = words(1,500);
    for method in [Method::Huffman,Method::Fast] {
        let packed = rnc::pack_slice(&dat,&opt(method,0)).expect("pack failed");
        for i in 18..packed.len() {
            let mut bad = packed.clone();
            bad[i] ^= 0x40;
            assert!(matches!(rnc::unpack_slice(&bad,&STD_OPTIONS),Err(Error::PackedCrc { .. })));
        }
    }
}

#[test]
fn unpacked_crc_gate() {
    let dat = words(2,500);
    let mut packed = rnc::pack_slice(&dat,&STD_OPTIONS).expect("pack failed");
    packed[12] ^= 0x01;
    assert!(matches!(rnc::unpack_slice(&packed,&STD_OPTIONS),Err(Error::UnpackedCrc { .. })));
}

#[test]
fn double_pack() {
    let packed = rnc::pack_slice(&words(3,200),&STD_OPTIONS).expect("pack failed");
    assert!(matches!(rnc::pack_slice(&packed,&STD_OPTIONS),Err(Error::AlreadyPacked)));
}

#[test]
fn key_required() {
    let dat = words(4,300);
    for method in [Method::Huffman,Method::Fast] {
        let packed = rnc::pack_slice(&dat,&opt(method,0xbeef)).expect("pack failed");
        assert!(matches!(rnc::unpack_slice(&packed,&STD_OPTIONS),Err(Error::KeyRequired)));
        // a wrong key unpacks to garbage, which the CRC catches
        assert!(matches!(rnc::unpack_slice(&packed,&opt(method,0xbeee)),Err(Error::UnpackedCrc { .. })));
        // an unneeded key is ignored
        let plain = rnc::pack_slice(&dat,&opt(method,0)).expect("pack failed");
        assert_eq!(rnc::unpack_slice(&plain,&opt(method,0x5555)).expect("unpack failed"),dat);
    }
}

#[test]
fn locked() {
    let o = Options { lock: true, ..STD_OPTIONS };
    let packed = rnc::pack_slice(&words(6,300),&o).expect("pack failed");
    assert!(matches!(rnc::unpack_slice(&packed,&STD_OPTIONS),Err(Error::Locked)));
}

#[test]
fn degenerate_sizes() {
    for n in [0,17,18] {
        assert!(matches!(rnc::pack_slice(&vec![0;n],&STD_OPTIONS),Err(Error::TooSmall)));
        assert!(matches!(rnc::unpack_slice(&vec![0;n],&STD_OPTIONS),Err(Error::TooSmall)));
    }
    let mut hdr_only = b"RNC\x01".to_vec();
    hdr_only.extend(vec![0;14]);
    assert!(matches!(rnc::unpack_slice(&hdr_only,&STD_OPTIONS),Err(Error::TooSmall)));
}

#[test]
fn bad_headers() {
    let mut packed = rnc::pack_slice(&words(8,300),&STD_OPTIONS).expect("pack failed");
    packed.truncate(packed.len() - 1);
    assert!(matches!(rnc::unpack_slice(&packed,&STD_OPTIONS),Err(Error::Truncated)));
    packed[3] = 9;
    assert!(matches!(rnc::unpack_slice(&packed,&STD_OPTIONS),Err(Error::UnknownMethod(9))));
    packed[3] = 1;
    packed[4] = 0x7f;
    assert!(matches!(rnc::unpack_slice(&packed,&STD_OPTIONS),Err(Error::TooLarge)));
    assert!(matches!(rnc::unpack_slice(&words(8,300),&STD_OPTIONS),Err(Error::NotPacked)));
}

#[test]
fn zeros_pack_small() {
    let packed = rnc::pack_slice(&[0;100],&opt(Method::Fast,0)).expect("pack failed");
    assert!(packed.len() < 30);
}

#[test]
fn search_two_archives() {
    let a = words(9,400);
    let b = lcg_bytes(10,50).repeat(20);
    let pa = rnc::pack_slice(&a,&opt(Method::Huffman,0)).expect("pack failed");
    let pb = rnc::pack_slice(&b,&opt(Method::Fast,0)).expect("pack failed");
    let mut image = lcg_bytes(12,333);
    // a false signature in the padding
    image.extend_from_slice(b"RNC\x02garbage that is not an archive");
    let off_a = image.len();
    image.extend_from_slice(&pa);
    image.extend(lcg_bytes(13,100));
    let off_b = image.len();
    image.extend_from_slice(&pb);
    image.extend(lcg_bytes(14,10));

    let found = rnc::search(&image,&STD_OPTIONS,false).expect("search failed");
    assert_eq!(found.len(),2);
    assert_eq!(found[0].offset,off_a);
    assert_eq!(found[0].packed_size,pa.len() - 18);
    assert_eq!(found[0].unpacked_size,a.len());
    assert_eq!(found[0].data,None);
    assert_eq!(found[1].offset,off_b);
    assert_eq!(found[1].total_size(),pb.len());
    // determinism
    assert_eq!(rnc::search(&image,&STD_OPTIONS,false).expect("search failed"),found);

    let found = rnc::search(&image,&STD_OPTIONS,true).expect("search failed");
    assert_eq!(found[0].data.as_deref(),Some(&a[..]));
    assert_eq!(found[1].data.as_deref(),Some(&b[..]));

    let later = Options { in_offset: off_a as u64 + 1, ..STD_OPTIONS };
    let found = rnc::search(&image,&later,false).expect("search failed");
    assert_eq!(found.len(),1);
    assert_eq!(found[0].offset,off_b);
}

#[test]
fn search_and_save() {
    let a = words(15,300);
    let mut image = vec![0xaa;0x20];
    image.extend(rnc::pack_slice(&a,&STD_OPTIONS).expect("pack failed"));
    let dir = tempfile::tempdir().expect("no temp dir");
    let found = rnc::search_and_save(&image,&STD_OPTIONS,dir.path()).expect("search failed");
    assert_eq!(found.len(),1);
    let saved = std::fs::read(dir.path().join("data_000020.bin")).expect("not saved");
    assert_eq!(saved,a);
    let missing = dir.path().join("no_such_dir");
    assert!(matches!(rnc::search_and_save(&image,&STD_OPTIONS,&missing),Err(Error::Extract { .. })));
}

#[test]
fn search_nothing() {
    assert!(matches!(rnc::search(&lcg_bytes(16,1000),&STD_OPTIONS,false),Err(Error::NotFound)));
    assert!(matches!(rnc::search(&[],&STD_OPTIONS,false),Err(Error::NotFound)));
}
