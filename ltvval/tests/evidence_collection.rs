mod test_pki;

use std::rc::Rc;

use ltvval::*;
use test_pki::*;

const SIGNATURE: &[u8] = b"signature contents";

fn root_only(pki: &Pki) -> TrustIndex {
    let mut ti = TrustIndex::new();
    ti.add_trusted(&[pki.root.clone()]);
    ti
}

fn leaf_ocsp(pki: &Pki) -> Vec<u8> {
    make_ocsp(
        &pki.leaf,
        &pki.intermediate,
        good(),
        INTERMEDIATE,
        INTERMEDIATE_KEY,
        &[],
    )
}

fn intermediate_ocsp(pki: &Pki) -> Vec<u8> {
    make_ocsp(&pki.intermediate, &pki.root, good(), ROOT, ROOT_KEY, &[])
}

#[test]
fn end_to_end_whole_chain_ocsp() {
    let env = test_env();
    let pki = pki();
    let mut ti = root_only(&pki);

    let ocsp_client = MockOcspClient::default()
        .with(&pki.leaf, leaf_ocsp(&pki))
        .with(&pki.intermediate, intermediate_ocsp(&pki));
    let crl_client = MockCrlClient::default();
    let crl_calls = Rc::clone(&crl_client.calls);

    let mut collector = LtvCollector::new(&env, &mut ti);
    collector
        .add_signature("Signature1", SIGNATURE, &pki.supplied_chain())
        .unwrap();
    collector
        .add_verification(
            "Signature1",
            &ocsp_client,
            &crl_client,
            CertificateOption::WholeChain,
            RevocationLevel::Ocsp,
            RevocationNecessity::RequiredForSigningCertificate,
        )
        .unwrap();

    let bundle = collector.bundle("Signature1").unwrap();
    assert_eq!(2, bundle.ocsps.len());
    assert_eq!(0, bundle.crls.len());
    assert_eq!(3, bundle.certs.len());
    assert_eq!(0, crl_calls.get());
    assert_eq!(2, ocsp_client.calls.get());

    let mut resolver = ChainResolver::new(&env, &mut ti);
    assert_eq!(
        vec![vec![
            pki.root.clone(),
            pki.intermediate.clone(),
            pki.leaf.clone()
        ]],
        resolver.resolve_chains(&pki.leaf)
    );
    assert_eq!(
        Some(CertificateOrigin::SignatureContainer),
        ti.origin_of(&pki.intermediate)
    );
}

#[test]
fn ocsp_optional_crl_fallback() {
    let env = test_env();
    let pki = pki();
    let crl = make_crl(INTERMEDIATE, INTERMEDIATE_KEY, &[]);

    // OCSP available, no CRL fetch
    let mut ti = root_only(&pki);
    let ocsp_client = MockOcspClient::default().with(&pki.leaf, leaf_ocsp(&pki));
    let crl_client = MockCrlClient::default().with(&pki.leaf, crl.clone());
    let mut collector = LtvCollector::new(&env, &mut ti);
    let chain = [pki.leaf.clone(), pki.intermediate.clone()];
    let bundle = collector
        .collect(
            &chain,
            &pki.leaf,
            &ocsp_client,
            &crl_client,
            CertificateOption::SigningCertificateOnly,
            RevocationLevel::OcspOptionalCrl,
            RevocationNecessity::Optional,
        )
        .unwrap();
    assert_eq!(1, bundle.ocsps.len());
    assert!(bundle.crls.is_empty());
    assert_eq!(0, crl_client.calls.get());

    // OCSP absent, exactly one CRL fetch
    let ocsp_client = MockOcspClient::default();
    let bundle = collector
        .collect(
            &chain,
            &pki.leaf,
            &ocsp_client,
            &crl_client,
            CertificateOption::SigningCertificateOnly,
            RevocationLevel::OcspOptionalCrl,
            RevocationNecessity::Optional,
        )
        .unwrap();
    assert_eq!(1, ocsp_client.calls.get());
    assert_eq!(1, crl_client.calls.get());
    assert!(bundle.ocsps.is_empty());
    assert_eq!(vec![crl], bundle.crls);
}

#[test]
fn ocsp_then_crl_collects_both() {
    let env = test_env();
    let pki = pki();
    let mut ti = root_only(&pki);
    let ocsp_client = MockOcspClient::default().with(&pki.leaf, leaf_ocsp(&pki));
    let crl_client = MockCrlClient::default()
        .with(&pki.leaf, make_crl(INTERMEDIATE, INTERMEDIATE_KEY, &[]));
    let mut collector = LtvCollector::new(&env, &mut ti);
    let bundle = collector
        .collect(
            &[pki.leaf.clone(), pki.intermediate.clone()],
            &pki.leaf,
            &ocsp_client,
            &crl_client,
            CertificateOption::SigningCertificateOnly,
            RevocationLevel::OcspThenCrl,
            RevocationNecessity::Optional,
        )
        .unwrap();
    assert_eq!(1, bundle.ocsps.len());
    assert_eq!(1, bundle.crls.len());
    assert_eq!(vec![pki.leaf.encoded_cert.clone()], bundle.certs);
}

#[test]
fn required_for_signing_certificate() {
    let env = test_env();
    let pki = pki();
    let mut ti = root_only(&pki);
    let mut collector = LtvCollector::new(&env, &mut ti);
    let chain = [
        pki.leaf.clone(),
        pki.intermediate.clone(),
        pki.root.clone(),
    ];

    let nothing = MockOcspClient::default();
    let no_crls = MockCrlClient::default();
    assert_eq!(
        Err(Error::NoRevocationDataForSigningCertificate(
            pki.leaf.subject_name()
        )),
        collector.collect(
            &chain,
            &pki.leaf,
            &nothing,
            &no_crls,
            CertificateOption::WholeChain,
            RevocationLevel::OcspOptionalCrl,
            RevocationNecessity::RequiredForSigningCertificate,
        )
    );

    // nothing for the intermediate is tolerated
    let leaf_only = MockOcspClient::default().with(&pki.leaf, leaf_ocsp(&pki));
    let bundle = collector
        .collect(
            &chain,
            &pki.leaf,
            &leaf_only,
            &no_crls,
            CertificateOption::WholeChain,
            RevocationLevel::OcspOptionalCrl,
            RevocationNecessity::RequiredForSigningCertificate,
        )
        .unwrap();
    assert_eq!(1, bundle.ocsps.len());
}

#[test]
fn revoked_ocsp_response_is_not_collected() {
    let env = test_env();
    let pki = pki();
    let mut ti = root_only(&pki);
    let ocsp_client = MockOcspClient::default().with(
        &pki.leaf,
        make_ocsp(
            &pki.leaf,
            &pki.intermediate,
            revoked(),
            INTERMEDIATE,
            INTERMEDIATE_KEY,
            &[],
        ),
    );
    let mut collector = LtvCollector::new(&env, &mut ti);
    let bundle = collector
        .collect(
            &[pki.leaf.clone(), pki.intermediate.clone()],
            &pki.leaf,
            &ocsp_client,
            &MockCrlClient::default(),
            CertificateOption::SigningCertificateOnly,
            RevocationLevel::Ocsp,
            RevocationNecessity::Optional,
        )
        .unwrap();
    assert!(bundle.ocsps.is_empty());
}

#[test]
fn identical_crls_stored_once() {
    let env = test_env();
    let pki = pki();
    let mut ti = root_only(&pki);
    let crl = make_crl(INTERMEDIATE, INTERMEDIATE_KEY, &[]);
    let crl_client = MockCrlClient::default()
        .with(&pki.leaf, crl.clone())
        .with(&pki.leaf, crl.clone())
        .with(&pki.leaf, b"not a crl".to_vec());
    let mut collector = LtvCollector::new(&env, &mut ti);
    let bundle = collector
        .collect(
            &[pki.leaf.clone(), pki.intermediate.clone()],
            &pki.leaf,
            &MockOcspClient::default(),
            &crl_client,
            CertificateOption::SigningCertificateOnly,
            RevocationLevel::Crl,
            RevocationNecessity::RequiredForSigningCertificate,
        )
        .unwrap();
    assert_eq!(vec![crl], bundle.crls);
}

#[test]
fn byte_identical_signatures_share_evidence() {
    let env = test_env();
    let pki = pki();
    let mut ti = root_only(&pki);
    let ocsp_client = MockOcspClient::default()
        .with(&pki.leaf, leaf_ocsp(&pki))
        .with(&pki.intermediate, intermediate_ocsp(&pki));
    let crl_client = MockCrlClient::default();

    let mut collector = LtvCollector::new(&env, &mut ti);
    for name in ["Signature1", "Signature2"] {
        collector
            .add_signature(name, SIGNATURE, &pki.supplied_chain())
            .unwrap();
        collector
            .add_verification(
                name,
                &ocsp_client,
                &crl_client,
                CertificateOption::WholeChain,
                RevocationLevel::Ocsp,
                RevocationNecessity::Optional,
            )
            .unwrap();
    }
    assert_eq!(1, collector.bundles().len());
    let bundle = collector.bundle("Signature2").unwrap().clone();
    assert_eq!(Some(&bundle), collector.bundle("Signature1"));

    let mut dss = Dss::new();
    collector.merge(&mut dss).unwrap();
    assert_eq!(bundle.len(), dss.object_count());
    assert_eq!(Some(bundle), dss.bundle_for(&signature_key(SIGNATURE)));

    assert_eq!(Err(Error::AlreadyMerged), collector.merge(&mut dss));
    assert_eq!(
        Err(Error::CollectorClosed),
        collector.add_signature("Signature3", b"other", &pki.supplied_chain())
    );
    assert_eq!(
        Err(Error::CollectorClosed),
        collector.add_verification(
            "Signature1",
            &ocsp_client,
            &crl_client,
            CertificateOption::WholeChain,
            RevocationLevel::Ocsp,
            RevocationNecessity::Optional,
        )
    );
}

#[test]
fn all_certificates_completes_chain() {
    let env = test_env();
    let pki = pki();
    let responder = make_cert(
        "CN=Test OCSP Responder,O=Example",
        b"responder-key",
        INTERMEDIATE,
        INTERMEDIATE_KEY,
        50,
        vec![ocsp_signing_ext(), ocsp_no_check_ext()],
    );
    let mut ti = root_only(&pki);
    ti.add_known(&[pki.intermediate.clone()], CertificateOrigin::Aia);
    let ocsp_client = MockOcspClient::default()
        .with(
            &pki.leaf,
            make_ocsp(
                &pki.leaf,
                &pki.intermediate,
                good(),
                "CN=Test OCSP Responder,O=Example",
                b"responder-key",
                &[&responder],
            ),
        )
        .with(&pki.intermediate, intermediate_ocsp(&pki));
    let calls = Rc::clone(&ocsp_client.calls);

    let mut collector = LtvCollector::new(&env, &mut ti);
    let bundle = collector
        .collect(
            &[pki.leaf.clone()],
            &pki.leaf,
            &ocsp_client,
            &MockCrlClient::default(),
            CertificateOption::AllCertificates,
            RevocationLevel::Ocsp,
            RevocationNecessity::RequiredForSigningCertificate,
        )
        .unwrap();

    // leaf and intermediate are fetched, the no-check responder and the root are not
    assert_eq!(2, calls.get());
    assert_eq!(2, bundle.ocsps.len());
    assert_eq!(4, bundle.certs.len());
    for c in [&pki.leaf, &pki.intermediate, &pki.root, &responder] {
        assert!(bundle.certs.contains(&c.encoded_cert));
    }
}

#[test]
fn short_term_certificates_are_skipped() {
    let env = test_env();
    let pki = pki();
    let short_term = make_cert(
        LEAF,
        LEAF_KEY,
        INTERMEDIATE,
        INTERMEDIATE_KEY,
        80,
        vec![short_term_ext()],
    );
    let mut ti = root_only(&pki);
    let ocsp_client = MockOcspClient::default();
    let mut collector = LtvCollector::new(&env, &mut ti);
    let bundle = collector
        .collect(
            &[short_term.clone(), pki.intermediate.clone()],
            &short_term,
            &ocsp_client,
            &MockCrlClient::default(),
            CertificateOption::SigningCertificateOnly,
            RevocationLevel::OcspThenCrl,
            RevocationNecessity::RequiredForSigningCertificate,
        )
        .unwrap();
    assert!(bundle.is_empty());
    assert_eq!(0, ocsp_client.calls.get());
}

#[test]
fn settings_drive_collection() {
    let env = test_env();
    let pki = pki();
    let mut ti = root_only(&pki);
    let mut settings = LtvSettings::new();
    set_certificate_option(&mut settings, CertificateOption::SigningCertificateOnly);
    set_revocation_level(&mut settings, RevocationLevel::Crl);
    set_revocation_necessity(&mut settings, RevocationNecessity::Optional);
    set_retrieve_from_aia(&mut settings, false);

    let ocsp_client = MockOcspClient::default().with(&pki.leaf, leaf_ocsp(&pki));
    let crl_client = MockCrlClient::default();
    let mut collector = LtvCollector::new(&env, &mut ti);
    collector
        .add_signature("Signature1", SIGNATURE, &pki.supplied_chain())
        .unwrap();
    collector
        .add_verification_with_settings("Signature1", &ocsp_client, &crl_client, &settings)
        .unwrap();
    assert_eq!(0, ocsp_client.calls.get());
    assert_eq!(1, crl_client.calls.get());
    assert_eq!(
        Some(&ValidationBundle {
            crls: vec![],
            ocsps: vec![],
            certs: vec![pki.leaf.encoded_cert.clone()],
        }),
        collector.bundle("Signature1")
    );
}

#[test]
fn aia_setting_applies_to_one_verification() {
    let pki = pki();
    let leaf = make_cert(
        LEAF,
        LEAF_KEY,
        INTERMEDIATE,
        INTERMEDIATE_KEY,
        31,
        vec![ca_issuers_ext(&["http://example.com/int.cer"])],
    );
    let mut fetcher = MockAiaFetcher::default();
    fetcher.resources.insert(
        "http://example.com/int.cer".to_string(),
        pki.intermediate.encoded_cert.clone(),
    );
    let fetches = Rc::clone(&fetcher.calls);
    let mut env = test_env();
    env.add_aia_fetcher(Box::new(fetcher));

    let mut settings = LtvSettings::new();
    set_certificate_option(&mut settings, CertificateOption::AllCertificates);
    set_revocation_level(&mut settings, RevocationLevel::Ocsp);
    set_revocation_necessity(&mut settings, RevocationNecessity::Optional);
    set_retrieve_from_aia(&mut settings, false);

    let mut ti = root_only(&pki);
    let ocsp_client = MockOcspClient::default();
    let crl_client = MockCrlClient::default();
    let mut collector = LtvCollector::new(&env, &mut ti);
    collector
        .add_signature("Signature1", SIGNATURE, &[leaf.encoded_cert.clone()])
        .unwrap();
    collector
        .add_verification_with_settings("Signature1", &ocsp_client, &crl_client, &settings)
        .unwrap();
    assert_eq!(0, fetches.get());
    assert!(collector.retrieve_from_aia());

    collector
        .add_verification(
            "Signature1",
            &ocsp_client,
            &crl_client,
            CertificateOption::AllCertificates,
            RevocationLevel::Ocsp,
            RevocationNecessity::Optional,
        )
        .unwrap();
    assert!(fetches.get() >= 1);
}

#[test]
fn unknown_signature_and_empty_chain() {
    let env = test_env();
    let mut ti = TrustIndex::new();
    let mut collector = LtvCollector::new(&env, &mut ti);
    let empty: Vec<Vec<u8>> = vec![];
    assert_eq!(
        Err(Error::NotFound),
        collector.add_signature("Signature1", SIGNATURE, &empty)
    );
    assert_eq!(
        Err(Error::NotFound),
        collector.add_verification(
            "Signature1",
            &MockOcspClient::default(),
            &MockCrlClient::default(),
            CertificateOption::WholeChain,
            RevocationLevel::Ocsp,
            RevocationNecessity::Optional,
        )
    );
    assert!(collector
        .add_signature("Signature1", SIGNATURE, &[b"garbage".to_vec()])
        .is_err());
}
