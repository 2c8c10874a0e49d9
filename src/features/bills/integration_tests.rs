//! 経費ワークフロー統合テスト
//!
//! 永続化されたセッションストアから従業員としてログインし、
//! 一覧表示から新規経費の送信、一覧への復帰までをモックサービスで検証します。

#[cfg(test)]
mod integration_tests {
    use crate::features::bills::mock::{MockStore, MOCK_BILL_KEY, MOCK_FILE_URL};
    use crate::features::bills::{DraftState, ReceiptFile, RetryPolicy, Store};
    use crate::features::dom::{Document, SubmitEvent};
    use crate::features::navigation::{Page, Route, Router};
    use crate::features::session::{Session, SessionStore, SqliteSessionStore, UserType};
    use crate::features::views::new_bill_ui::{
        AMOUNT_ID, COMMENTARY_ID, DATEPICKER_ID, ERROR_ID, EXPENSE_NAME_ID, EXPENSE_TYPE_ID,
        FILE_ID, FORM_ID, PCT_ID, VAT_ID,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    /// テスト用のセッションストア（従業員a@aでログイン済み）
    fn create_logged_in_store(dir: &TempDir) -> SqliteSessionStore {
        let store = SqliteSessionStore::open(dir.path().join("local_storage.db"))
            .expect("セッションストアの作成に失敗");
        Session::new(UserType::Employee, "a@a")
            .save_to(&store)
            .expect("セッションの保存に失敗");
        store
    }

    fn create_router(dir: &TempDir, store: Arc<MockStore>) -> Router {
        let session_store = create_logged_in_store(dir);
        Router::from_session_store(
            Document::new(),
            Some(store as Arc<dyn Store>),
            &session_store,
            RetryPolicy {
                max_retries: 2,
                base_delay: Duration::from_millis(1),
                ..RetryPolicy::default()
            },
        )
        .expect("ルーターの作成に失敗")
    }

    /// 統合テスト: 一覧 → 新規作成 → 送信 → 一覧
    #[tokio::test]
    async fn test_employee_submits_new_bill() {
        let dir = TempDir::new().expect("一時ディレクトリの作成に失敗");
        let store = Arc::new(MockStore::new());
        let router = create_router(&dir, store.clone());

        // 1. 一覧ページ
        let Page::Bills(bills_page) = router.navigate(Route::Bills).await.expect("一覧の表示に失敗")
        else {
            panic!("一覧ページではありません");
        };
        let document = router.document().clone();
        assert!(document.contains_text("Mes notes de frais"));
        assert!(document.contains_text("4 Avr. 04"));

        // 2. 新規作成ボタン
        let button = document.get_by_test_id("btn-new-bill").expect("ボタンがありません");
        bills_page.handle_click(&button).expect("クリック処理に失敗");
        assert!(document.has_test_id(FORM_ID));

        let Page::NewBill(form) = router.navigate(Route::NewBill).await.expect("フォームの表示に失敗")
        else {
            panic!("新規作成ページではありません");
        };

        // 3. 不正な拡張子はエラー表示のみ
        let mp3 = ReceiptFile::new("song.mp3", "audio/mpeg", vec![1, 2, 3]);
        let event = document.select_files(FILE_ID, vec![mp3]).expect("ファイル選択に失敗");
        assert_eq!(form.handle_change_file(&event).await.unwrap(), DraftState::ErrorShown);
        assert!(!document.is_hidden(ERROR_ID).unwrap());
        assert_eq!(store.service().create_calls(), 0);

        // 4. pngはアップロードされる
        let png = ReceiptFile::new("facture.png", "image/png", vec![0x89, 0x50]);
        let event = document.select_files(FILE_ID, vec![png]).expect("ファイル選択に失敗");
        assert_eq!(form.handle_change_file(&event).await.unwrap(), DraftState::Ready);
        assert!(document.is_hidden(ERROR_ID).unwrap());
        assert_eq!(form.file_url().as_deref(), Some(MOCK_FILE_URL));
        assert_eq!(form.file_name().as_deref(), Some("facture.png"));

        // 5. 入力して送信
        document.set_value(EXPENSE_TYPE_ID, "Hôtel et logement").unwrap();
        document.set_value(EXPENSE_NAME_ID, "Séminaire Lyon").unwrap();
        document.set_value(DATEPICKER_ID, "2004-04-04").unwrap();
        document.set_value(AMOUNT_ID, "400").unwrap();
        document.set_value(VAT_ID, "80").unwrap();
        document.set_value(PCT_ID, "20").unwrap();
        document.set_value(COMMENTARY_ID, "séminaire billed").unwrap();

        let history_before = router.history().len();
        let mut submit = SubmitEvent::new(FORM_ID);
        let ticket = form.handle_submit(&mut submit).expect("送信に失敗");

        assert!(submit.default_prevented());
        let history = router.history();
        assert_eq!(history.len(), history_before + 1);
        assert_eq!(history.last(), Some(&Route::Bills));

        // 6. 保存結果
        let saved = ticket.outcome().await.expect("保存に失敗");
        assert_eq!(saved.id, MOCK_BILL_KEY);
        assert_eq!(saved.expense_type, "Hôtel et logement");
        assert_eq!(saved.amount, 400.0);
        assert_eq!(saved.file_url.as_deref(), Some(MOCK_FILE_URL));

        // 7. 一覧を再表示すると新しい経費が含まれる
        router.navigate(Route::Bills).await.expect("一覧の再表示に失敗");
        assert_eq!(document.get_all_by_test_id("icon-eye").len(), 5);
        assert!(document.contains_text("Séminaire Lyon"));
        assert!(document.contains_text("400 €"));
    }

    /// 統合テスト: 保存が失敗し続けた場合も画面遷移し、失敗が記録される
    #[tokio::test]
    async fn test_failed_persistence_is_reported() {
        let dir = TempDir::new().expect("一時ディレクトリの作成に失敗");
        let store = Arc::new(MockStore::new());
        store.service().fail_next_updates(10, "Erreur 500");
        let router = create_router(&dir, store.clone());

        let Page::NewBill(form) = router.navigate(Route::NewBill).await.unwrap() else {
            panic!("新規作成ページではありません");
        };
        let document = router.document().clone();

        let jpg = ReceiptFile::new("test.JPG", "image/jpeg", vec![0xff, 0xd8]);
        let event = document.select_files(FILE_ID, vec![jpg]).unwrap();
        form.handle_change_file(&event).await.unwrap();
        document.set_value(DATEPICKER_ID, "2004-04-04").unwrap();
        document.set_value(AMOUNT_ID, "348").unwrap();

        let ticket = form.handle_submit(&mut SubmitEvent::new(FORM_ID)).unwrap();
        assert_eq!(router.active_route(), Some(Route::Bills));

        let error = ticket.outcome().await.unwrap_err();
        assert_eq!(error.user_message(), "Erreur 500");
        assert_eq!(store.service().update_calls(), 3);

        let failures = router.retry_queue().expect("再試行キューがありません").failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].selector, MOCK_BILL_KEY);
        assert_eq!(failures[0].bill.pct, 20);
    }

    /// 統合テスト: セッションは再起動後も読み込める
    #[test]
    fn test_session_survives_reopen() {
        let dir = TempDir::new().expect("一時ディレクトリの作成に失敗");
        drop(create_logged_in_store(&dir));

        let reopened = SqliteSessionStore::open(dir.path().join("local_storage.db"))
            .expect("セッションストアの再オープンに失敗");
        let session = Session::from_store(&reopened).expect("セッションの読み込みに失敗");
        assert!(session.is_employee());
        assert_eq!(session.email, "a@a");
        assert!(reopened.get_item("jwt").unwrap().is_none());
    }
}
